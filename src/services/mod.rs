//! 服务模块

pub mod picture_ingestion;
pub mod profile;

pub use picture_ingestion::{IngestionPolicy, PictureIngestion};
pub use profile::{
    Pagination, ProfilePage, ProfileService, ProfileServiceImpl, create_profile_service,
};
