use crate::core::version_gate::ConfigSchema;
use crate::utils::error::{DeployError, Result};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::fs;
use std::path::{Path, PathBuf};

pub const JASPER_LISTENER: &str = "org.apache.catalina.core.JasperListener";

const ALLOW_LINKING: &str = "allowLinking";

/// 以事件序列保存的 XML 文件。
///
/// 未改動的部分 (宣告、註解、空白、屬性原文) 寫回時逐字保留，
/// 只有被改寫的元素會重新序列化。
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    path: PathBuf,
    events: Vec<Event<'static>>,
}

impl ConfigDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| structural(path, format!("cannot read file: {}", e)))?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let mut reader = Reader::from_str(content);
        let mut events = Vec::new();
        let mut depth = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Eof) if depth > 0 => {
                    return Err(structural(
                        path,
                        format!("unexpected end of document, {} element(s) left open", depth),
                    ))
                }
                Ok(Event::Eof) => break,
                Ok(event) => {
                    match &event {
                        Event::Start(_) => depth += 1,
                        Event::End(_) => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    events.push(event.into_owned());
                }
                Err(e) => {
                    return Err(structural(
                        path,
                        format!("malformed XML near byte {}: {}", reader.buffer_position(), e),
                    ))
                }
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            events,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tomcat 7 以前：在第一個 `<Service>` 之前插入 JasperListener
    pub fn insert_jasper_listener(&mut self) -> Result<()> {
        let root = self.root("Server")?;
        let service = self
            .first_child(root, "Service")
            .ok_or_else(|| self.structural("no <Service> element under <Server>".to_string()))?;

        let mut listener = BytesStart::new("Listener");
        listener.push_attribute(("className", JASPER_LISTENER));

        let mut inserted = vec![Event::Empty(listener)];
        if let Some(indent) = self.indent_before(service) {
            inserted.push(indent);
        }
        self.events.splice(service..service, inserted);
        Ok(())
    }

    /// 依 schema 在 `<Context>` 上開啟 allowLinking
    pub fn allow_linking(&mut self, schema: ConfigSchema) -> Result<()> {
        let root = self.root("Context")?;

        match schema {
            ConfigSchema::Legacy => {
                if let Some(resources) = self.first_child(root, "Resources") {
                    if self.has_attribute(resources, ALLOW_LINKING) {
                        self.rewrite_attribute(resources, ALLOW_LINKING, None);
                    }
                }
                self.rewrite_attribute(root, ALLOW_LINKING, Some("true"));
            }
            ConfigSchema::Modern => {
                // 兩種寫法只能留一種
                if self.has_attribute(root, ALLOW_LINKING) {
                    self.rewrite_attribute(root, ALLOW_LINKING, None);
                }
                if let Some(existing) = self.first_child(root, "Resources") {
                    self.rewrite_attribute(existing, ALLOW_LINKING, Some("true"));
                    return Ok(());
                }

                let mut resources = BytesStart::new("Resources");
                resources.push_attribute((ALLOW_LINKING, "true"));

                if let Event::Empty(e) = &self.events[root] {
                    let start = e.clone();
                    self.events[root] = Event::Start(start);
                    self.events.splice(
                        root + 1..root + 1,
                        [Event::Empty(resources), Event::End(BytesEnd::new("Context"))],
                    );
                    return Ok(());
                }

                let close = self
                    .closing_tag(root)
                    .ok_or_else(|| self.structural("<Context> is never closed".to_string()))?;

                // 接在最後一個子元素之後，沿用第一個子元素前的縮排
                let position = if self.whitespace_at(close - 1).is_some() {
                    close - 1
                } else {
                    close
                };
                let mut inserted = Vec::new();
                if let Some(indent) = self.whitespace_at(root + 1) {
                    inserted.push(indent);
                }
                inserted.push(Event::Empty(resources));
                self.events.splice(position..position, inserted);
            }
        }

        Ok(())
    }

    /// 根元素上的屬性值 (未解碼的原文)
    pub fn root_attribute(&self, key: &str) -> Option<String> {
        let event = self
            .events
            .iter()
            .find(|e| matches!(e, Event::Start(_) | Event::Empty(_)))?;
        let element = match event {
            Event::Start(e) | Event::Empty(e) => e,
            _ => return None,
        };
        element
            .attributes()
            .flatten()
            .find(|a| a.key.as_ref() == key.as_bytes())
            .map(|a| String::from_utf8_lossy(&a.value).into_owned())
    }

    /// 根元素底下直接子元素的名稱，依文件順序
    pub fn child_names(&self) -> Vec<String> {
        let Some(root) = self
            .events
            .iter()
            .position(|e| matches!(e, Event::Start(_) | Event::Empty(_)))
        else {
            return Vec::new();
        };
        if matches!(self.events[root], Event::Empty(_)) {
            return Vec::new();
        }

        let mut names = Vec::new();
        let mut depth = 0usize;
        for event in &self.events[root + 1..] {
            match event {
                Event::Start(e) => {
                    if depth == 0 {
                        names.push(qualified_name(e));
                    }
                    depth += 1;
                }
                Event::Empty(e) if depth == 0 => names.push(qualified_name(e)),
                Event::End(_) => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
        names
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.events {
            writer.write_event(event.clone())?;
        }
        Ok(writer.into_inner())
    }

    pub fn save(&self) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }

    fn root(&self, expected: &str) -> Result<usize> {
        let index = self
            .events
            .iter()
            .position(|e| matches!(e, Event::Start(_) | Event::Empty(_)))
            .ok_or_else(|| self.structural(format!("no root element, expected <{}>", expected)))?;

        let found = match &self.events[index] {
            Event::Start(e) | Event::Empty(e) => qualified_name(e),
            _ => String::new(),
        };
        if found != expected {
            return Err(self.structural(format!(
                "root element is <{}>, expected <{}>",
                found, expected
            )));
        }
        Ok(index)
    }

    fn first_child(&self, root: usize, name: &str) -> Option<usize> {
        if matches!(self.events[root], Event::Empty(_)) {
            return None;
        }

        let mut depth = 0usize;
        for (index, event) in self.events.iter().enumerate().skip(root + 1) {
            match event {
                Event::Start(e) => {
                    if depth == 0 && e.name().as_ref() == name.as_bytes() {
                        return Some(index);
                    }
                    depth += 1;
                }
                Event::Empty(e) => {
                    if depth == 0 && e.name().as_ref() == name.as_bytes() {
                        return Some(index);
                    }
                }
                Event::End(_) => {
                    if depth == 0 {
                        return None;
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
        None
    }

    fn closing_tag(&self, root: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (index, event) in self.events.iter().enumerate().skip(root + 1) {
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    if depth == 0 {
                        return Some(index);
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
        None
    }

    fn whitespace_at(&self, index: usize) -> Option<Event<'static>> {
        match self.events.get(index)? {
            Event::Text(text) if !text.is_empty() && text.iter().all(u8::is_ascii_whitespace) => {
                Some(Event::Text(text.clone()))
            }
            _ => None,
        }
    }

    fn has_attribute(&self, index: usize, key: &str) -> bool {
        match &self.events[index] {
            Event::Start(e) | Event::Empty(e) => e
                .attributes()
                .flatten()
                .any(|a| a.key.as_ref() == key.as_bytes()),
            _ => false,
        }
    }

    /// 重建元素的開始標籤；`value` 為 None 時移除該屬性
    fn rewrite_attribute(&mut self, index: usize, key: &str, value: Option<&str>) {
        let updated = match &self.events[index] {
            Event::Start(e) => Event::Start(with_attribute(e, key, value)),
            Event::Empty(e) => Event::Empty(with_attribute(e, key, value)),
            _ => return,
        };
        self.events[index] = updated;
    }

    fn indent_before(&self, index: usize) -> Option<Event<'static>> {
        index.checked_sub(1).and_then(|i| self.whitespace_at(i))
    }

    fn structural(&self, reason: String) -> DeployError {
        structural(&self.path, reason)
    }
}

/// 改寫 conf/context.xml，讓 Tomcat 允許符號連結 (buildpack 以 symlink 放入 jar)
pub fn configure_linking(context_xml: &Path, schema: ConfigSchema) -> Result<()> {
    let mut document = ConfigDocument::load(context_xml)?;
    document.allow_linking(schema)?;
    document.save()?;

    tracing::debug!("Enabled linking in {} ({:?} schema)", context_xml.display(), schema);
    Ok(())
}

/// 改寫 conf/server.xml；只有 Tomcat 8 以前需要 JasperListener。回傳是否有插入。
pub fn configure_jasper(server_xml: &Path, schema: ConfigSchema) -> Result<bool> {
    if !schema.needs_jasper_listener() {
        return Ok(false);
    }

    let mut document = ConfigDocument::load(server_xml)?;
    document.insert_jasper_listener()?;
    document.save()?;

    tracing::debug!("Inserted JasperListener into {}", server_xml.display());
    Ok(true)
}

fn with_attribute(element: &BytesStart<'_>, key: &str, value: Option<&str>) -> BytesStart<'static> {
    let mut updated = BytesStart::new(qualified_name(element));
    for attribute in element.attributes().flatten() {
        if attribute.key.as_ref() != key.as_bytes() {
            updated.push_attribute(attribute);
        }
    }
    if let Some(value) = value {
        updated.push_attribute((key, value));
    }
    updated.into_owned()
}

fn qualified_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.name().as_ref()).into_owned()
}

fn structural(path: &Path, reason: String) -> DeployError {
    DeployError::StructuralConfig {
        path: path.to_path_buf(),
        reason,
    }
}
