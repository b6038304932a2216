use serde::Serialize;
use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

/// Wire shape of a stock entry. Every field is optional on input.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockEntryDoc {
    #[serde(rename = "stockId")]
    pub stock_id: Option<i64>,
    #[schema(example = "ACME")]
    pub name: Option<String>,
    #[schema(example = 10.5)]
    pub price: Option<f64>,
    #[schema(example = "Acme Inc")]
    pub company: Option<String>,
    #[schema(example = "2024-03-01T12:00:00Z")]
    pub created_at: Option<String>,
    #[schema(example = "2024-03-01T12:00:00Z")]
    pub updated_at: Option<String>,
}

/// `{id, message, data}`; `id` is omitted when zero, `data` when absent.
#[derive(ToSchema)]
pub struct EnvelopeDoc {
    pub id: Option<i64>,
    pub message: String,
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::stocks::create_stock,
        crate::routes::stocks::list_stocks,
        crate::routes::stocks::get_stock,
        crate::routes::stocks::update_stock,
        crate::routes::stocks::delete_stock,
    ),
    components(
        schemas(
            HealthResponse,
            StockEntryDoc,
            EnvelopeDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "stocks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_stock_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();
        assert!(paths.contains(&"/api/v1/stocks".to_string()));
        assert!(paths.contains(&"/api/v1/stocks/{id}".to_string()));
        assert!(paths.contains(&"/health".to_string()));
    }
}
