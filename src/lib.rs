pub mod codec;
pub mod encoding;
pub mod registry;
pub mod transcode;
pub mod preferences;
pub mod host;
pub mod lifecycle;
pub mod session;
pub mod utils;

// 重新导出主要结构
pub use codec::{Codec, CodecKind, CodecSettings};
pub use encoding::{detect_bom, Bom, TextEncoding};
pub use registry::{BufferId, BufferRegistry, Membership, Presentation};
pub use transcode::{decode_for_display, encode_for_storage, DecodedText};
pub use preferences::{CodecEntry, Preferences};
pub use host::{EditorHost, MemoryEditor};
pub use lifecycle::{BufferStatus, LifecycleController, OpenOutcome, SaveOutcome, SaveTransaction};
pub use session::Session;
pub use utils::ViewerError;

// 常量定义
pub const DEFAULT_CONFIG_NAME: &str = "compressed_view.json";
