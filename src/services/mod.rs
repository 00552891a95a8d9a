pub mod outpass_service;
pub mod outpass_service_impl;

pub use outpass_service::{
    ActingIdentity, CreateOutPassRequest, OutPassError, OutPassService,
};
pub use outpass_service_impl::SeaOrmOutPassService;
