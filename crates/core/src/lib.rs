pub mod common;
pub mod config;

pub mod market {
    pub mod entity;
    pub mod error;
    pub mod port;
}

pub mod engine {
    pub mod entity;
    pub mod error;
}

pub mod store {
    pub mod error;
    pub mod port;
}
