pub mod chat_llm;
pub mod db;
pub mod inference_llm;
pub mod memory;

pub use chat_llm::OpenAiChatAdapter;
pub use db::DbAdapter;
pub use inference_llm::InferenceEndpointAdapter;
pub use memory::MemoryStore;
