use serde_json::json;

use crate::commands::{load_config, runtime, CommandFailure, CommandResult};
use cobuy_core::{
    ApplicationError, BuyTogetherService, ExactMatchAggregator, RecommendationBuilder,
    SymbolCurrencyFormatter,
};
use cobuy_db::repositories::{SqlCartRepository, SqlCatalogRepository, SqlOrderHistoryRepository};
use cobuy_db::connect_with_settings;

/// Read-only: runs one aggregation pass and prints the view-model the storefront would render.
pub fn run() -> CommandResult {
    let config = match load_config("recommend") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("recommend") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let service = BuyTogetherService::new(
            SqlOrderHistoryRepository::new(pool.clone()),
            SqlCatalogRepository::new(pool.clone()),
            SqlCartRepository::new(pool.clone()),
            ExactMatchAggregator,
            RecommendationBuilder::new(
                SymbolCurrencyFormatter,
                config.storefront.default_currency.clone(),
            ),
        );

        let resolved = service.most_frequent_set().await.map_err(recommendation_failure);
        let run_result = resolved.and_then(|resolved| {
            let Some(resolved) = resolved else {
                return Ok(None);
            };
            let view = service
                .build_view(&resolved)
                .map_err(|error| recommendation_failure(ApplicationError::Domain(error)))?;
            Ok(Some(json!({
                "signature": resolved.set_count.signature.as_str(),
                "count": resolved.set_count.count,
                "view": view,
            })))
        });

        pool.close().await;
        run_result
    });

    match result {
        Ok(Some(data)) => CommandResult::success_with_data(
            "recommend",
            format!(
                "most frequent set {} seen in {} orders",
                data["signature"].as_str().unwrap_or("unknown"),
                data["count"]
            ),
            Some(data),
        ),
        Ok(None) => CommandResult::success_with_data(
            "recommend",
            "no completed order has three or more resolvable products",
            Some(serde_json::Value::Null),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("recommend", error_class, message, exit_code)
        }
    }
}

fn recommendation_failure(error: ApplicationError) -> CommandFailure {
    let error_class = match error {
        ApplicationError::Domain(_) => "recommendation_domain",
        _ => "recommendation_storage",
    };
    (error_class, error.to_string(), 7u8)
}
