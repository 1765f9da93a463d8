pub mod best_bets;
pub mod error;
pub mod examples;
pub mod params;
pub mod parser;
pub mod presenter;
pub mod query;
pub mod searcher;

pub use best_bets::{BestBets, BestBetsResolver};
pub use error::{SearchError, SearchResult};
pub use examples::FacetExampleFetcher;
pub use params::{DebugOptions, FacetParams, FieldFilter, SearchParams, SortDirection};
pub use parser::ParameterParser;
pub use presenter::ResultSetPresenter;
pub use query::QueryBuilder;
pub use searcher::Searcher;
