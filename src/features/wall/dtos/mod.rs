mod wall_dto;

pub use wall_dto::{BannerDto, CreatePostDto, PostResponseDto, WallQuery, WallResponseDto};
