pub mod canonical;
pub mod detail;
pub mod identifiers;
pub mod pub_date;
pub mod report;
pub mod source;

pub use canonical::*;
pub use detail::*;
pub use identifiers::*;
pub use pub_date::*;
pub use report::*;
pub use source::*;
