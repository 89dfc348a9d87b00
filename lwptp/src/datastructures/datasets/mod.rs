pub use current::CurrentDS;
pub use default::DefaultDS;
pub use parent::ParentDS;
pub use time_properties::TimePropertiesDS;

mod current;
mod default;
mod parent;
mod time_properties;
