pub mod url_pair;

pub use url_pair::Entity as UrlPairEntity;
