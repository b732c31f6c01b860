pub mod credentials;
pub mod docx;
pub mod generation_llm;
pub mod memory;
pub mod pdf;

pub use credentials::YamlCredentialStore;
pub use docx::DocxExporter;
pub use generation_llm::OpenAiGenerationAdapter;
pub use memory::InMemorySessionStore;
pub use pdf::PdfTextExtractor;
