//! 文件系统高级 API
//!
//! 这个模块把扫描、树模型和文件组装组合成一个只读的镜像视图，
//! 并提供把整个层次结构提取到宿主文件系统的功能。

mod config;
mod extract;
mod filesystem;

pub use config::Jffs2Config;
pub use extract::ExtractReport;
pub use filesystem::{DirEntry, Jffs2Fs};
