// Adapters layer: file system implementations of the collaborator ports.

pub mod libraries;
pub mod resources;
pub mod tarball;

pub use libraries::FsLibraryLinker;
pub use resources::DirectoryResourceCopier;
pub use tarball::TarballExtractor;
