/// 文档生命周期模块
///
/// 响应编辑器的生命周期事件（打开、保存前、保存后、关闭、激活），决定每个缓冲区
/// 使用的压缩算法与文本编码，驱动转码管线并维护缓冲区登记表。
///
/// # 架构设计
///
/// - **controller**: 状态机本体与五个事件处理器
/// - **save**: BeforeSave / FileSaved 之间的保存事务
/// - **actions**: 用户主动触发的切换、压缩、解压
///
/// # 使用示例
///
/// ```rust,ignore
/// use compressed_view::{LifecycleController, Preferences};
///
/// let mut controller = LifecycleController::new(Preferences::default());
/// controller.on_open(&mut editor, id)?;
/// // ... 用户编辑 ...
/// controller.on_before_save(&mut editor, id)?;
/// // 编辑器写盘
/// controller.on_file_saved(&mut editor, id)?;
/// ```
pub mod controller;
pub mod save;
pub mod actions;

pub use controller::{BufferStatus, LifecycleController, OpenOutcome};
pub use save::{SaveOutcome, SaveTransaction};
