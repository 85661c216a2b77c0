use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化日誌：`json` 為 true 時輸出一行一筆的 JSON (給 CI / staging 收集)，否則為精簡的終端格式。
///
/// `RUST_LOG` 有設定時優先採用。
pub fn init_logger(verbose: bool, json: bool) {
    let default_directive = if verbose {
        "liferay_provision=debug,info"
    } else {
        "liferay_provision=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| format_layer().json()))
        .with((!json).then(|| format_layer().compact()))
        .init();
}

fn format_layer<S>() -> fmt::Layer<S> {
    fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 全域 subscriber 只能設定一次，整個測試執行檔只在這裡初始化
    #[test]
    fn test_init_json_logger() {
        init_logger(true, true);
        tracing::debug!(schema = "Modern", "logger initialised");
    }
}
