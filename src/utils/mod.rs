pub mod path_validator;
pub mod project_lock;
