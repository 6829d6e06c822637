pub mod cdp;
pub mod page;

pub use page::HeadlessPage;
