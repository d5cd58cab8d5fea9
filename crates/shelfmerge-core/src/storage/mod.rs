pub mod landing;
pub mod publish;
pub mod schema;
