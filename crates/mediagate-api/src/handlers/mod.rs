pub mod health;
pub mod presign;
pub mod storage;
