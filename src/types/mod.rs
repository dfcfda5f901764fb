mod document;
mod movie;
mod resource;

pub use document::Document;
pub use movie::{Movie, MovieDraft, MoviePatch};
pub use resource::Resource;
