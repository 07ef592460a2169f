/// 宿主编辑器抽象层模块
///
/// 核心状态机只通过 `EditorHost` 访问编辑器，便于替换为真实编辑器或内存实现。
///
/// # 架构设计
///
/// - **traits**: 定义 `EditorHost` 接口与作用域撤销组 `UndoGroup`
/// - **memory**: 基于内存的默认实现 `MemoryEditor`
///
/// # 使用示例
///
/// ```rust
/// use compressed_view::host::{EditorHost, MemoryEditor};
///
/// let mut editor = MemoryEditor::new();
/// editor.write_file("notes.txt", "hello\n");
/// let id = editor.open_document("notes.txt");
/// assert_eq!(editor.raw_bytes(id), b"hello\n");
/// ```
pub mod traits;
pub mod memory;

// === 导出 trait 定义 ===
pub use traits::{EditorHost, UndoGroup};

// === 导出默认实现 ===
pub use memory::MemoryEditor;
