use serde_json::Value;
use tracing::info;

use crate::index::Index;
use crate::registry::Registries;

use super::best_bets::{BestBets, BestBetsResolver};
use super::error::SearchResult;
use super::examples::FacetExampleFetcher;
use super::params::SearchParams;
use super::parser::ParameterParser;
use super::presenter::ResultSetPresenter;
use super::query::QueryBuilder;

/// The whole read pipeline: parameter validation, best-bet lookup, query
/// execution, facet example fetching and presentation.
pub struct Searcher {
    index: Index,
    metasearch: Index,
    registries: Registries,
}

impl Searcher {
    pub fn new(index: Index, metasearch: Index, registries: Registries) -> Self {
        Self {
            index,
            metasearch,
            registries,
        }
    }

    /// Parse and run raw key-value parameters in one step. Validation
    /// failures are returned before anything reaches the engine.
    pub async fn run_raw(&self, raw: &[(String, String)]) -> SearchResult<Value> {
        let params = ParameterParser::parse(raw, self.index.field_definitions())?;
        self.run(&params).await
    }

    pub async fn run(&self, params: &SearchParams) -> SearchResult<Value> {
        let bets = self.resolve_bets(params).await?;
        let builder = QueryBuilder::new(params);
        let payload = builder.payload(&bets);
        let response = self.index.raw_search(&payload).await?;

        let presenter =
            ResultSetPresenter::new(params, &self.registries, self.index.field_definitions());
        let mut facets = presenter.presented_facets(&response).await?;
        let slugs = presenter.example_slugs(&facets);
        if !slugs.is_empty() {
            let fetcher = FacetExampleFetcher::new(&self.index, params, &builder, &bets);
            let examples = fetcher.fetch(&slugs).await?;
            ResultSetPresenter::merge_examples(&mut facets, &examples);
        }

        let presented = presenter.present(&response, facets, &payload).await?;
        info!(
            query = %params.query.as_deref().unwrap_or(""),
            total = presented["total"].as_u64().unwrap_or(0),
            "search complete"
        );
        Ok(presented)
    }

    async fn resolve_bets(&self, params: &SearchParams) -> SearchResult<BestBets> {
        if params.debug.disable_best_bets || params.query.is_none() {
            return Ok(BestBets::default());
        }
        Ok(BestBetsResolver::new(&self.metasearch)
            .resolve(params.query.as_deref())
            .await?)
    }
}
