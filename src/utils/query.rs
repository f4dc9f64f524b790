use std::collections::HashMap;

use mongodb::Collection;
use mongodb::bson::{Bson, Document, doc, oid::ObjectId};
use mongodb::options::FindOptions;
use serde::Serialize;
use serde::de::DeserializeOwned;
use rocket_okapi::okapi::schemars::JsonSchema;

/// Query parameters with reserved meaning; everything else in the raw map is
/// treated as an exact-match filter.
const RESERVED_PARAMS: [&str; 4] = ["q", "page", "limit", "sort"];

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Serialize, JsonSchema, PartialEq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: u64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: u64) -> Self {
        let pages = if limit > 0 {
            (total as i64 + limit - 1) / limit
        } else {
            0
        };
        Pagination { page, limit, total, pages }
    }
}

/// Combined filter: free-text OR across `search_fields`, exact matches for the
/// remaining parameters, and caller-supplied default filters last so request
/// parameters can never widen a role-scoped listing.
pub fn build_filter(
    params: &HashMap<String, String>,
    search_fields: &[&str],
    default_filter: Document,
) -> Document {
    let mut filter = Document::new();

    for (key, value) in params {
        if RESERVED_PARAMS.contains(&key.as_str()) {
            continue;
        }
        filter.insert(key.clone(), coerce_scalar(value));
    }

    if let Some(q) = params.get("q").map(|q| q.trim()).filter(|q| !q.is_empty()) {
        let pattern = regex::escape(q);
        let clauses: Vec<Document> = search_fields
            .iter()
            .map(|field| {
                let mut clause = Document::new();
                clause.insert(*field, doc! { "$regex": &pattern, "$options": "i" });
                clause
            })
            .collect();
        if !clauses.is_empty() {
            filter.insert("$or", clauses);
        }
    }

    for (key, value) in default_filter {
        filter.insert(key, value);
    }

    filter
}

/// Query-string values are untyped; booleans and object ids are the two
/// shapes that never exact-match as raw strings.
fn coerce_scalar(raw: &str) -> Bson {
    match raw {
        "true" => Bson::Boolean(true),
        "false" => Bson::Boolean(false),
        _ => match ObjectId::parse_str(raw) {
            Ok(oid) => Bson::ObjectId(oid),
            Err(_) => Bson::String(raw.to_string()),
        },
    }
}

pub fn page_params(params: &HashMap<String, String>) -> (i64, i64, u64) {
    let page = params
        .get("page")
        .and_then(|p| p.parse::<i64>().ok())
        .unwrap_or(1)
        .max(1);
    let limit = params
        .get("limit")
        .and_then(|l| l.parse::<i64>().ok())
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_LIMIT);
    let skip = ((page - 1) * limit) as u64;
    (page, limit, skip)
}

/// `sort=field` ascending, `sort=-field` descending, newest-first by default.
pub fn sort_spec(params: &HashMap<String, String>) -> Document {
    let mut sort = Document::new();
    match params.get("sort").map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(spec) => match spec.strip_prefix('-') {
            Some(field) => sort.insert(field, -1),
            None => sort.insert(spec, 1),
        },
        None => sort.insert("created_at", -1),
    };
    sort
}

/// Run a full list query: filter, sort, paginate, count. Shared by every
/// list-returning route; callers only supply search fields and role defaults.
pub async fn fetch_page<T>(
    coll: &Collection<T>,
    params: &HashMap<String, String>,
    search_fields: &[&str],
    default_filter: Document,
) -> Result<(Vec<T>, Pagination), mongodb::error::Error>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let filter = build_filter(params, search_fields, default_filter);
    let (page, limit, skip) = page_params(params);

    let find_options = FindOptions::builder()
        .skip(skip)
        .limit(limit)
        .sort(sort_spec(params))
        .build();

    let mut cursor = coll.find(filter.clone(), find_options).await?;

    let mut items = Vec::new();
    while cursor.advance().await? {
        items.push(cursor.deserialize_current()?);
    }

    let total = coll.count_documents(filter, None).await?;

    Ok((items, Pagination::new(page, limit, total)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn free_text_matches_any_search_field() {
        let filter = build_filter(&params(&[("q", "plumb")]), &["title", "description"], doc! {});
        let clauses = filter.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 2);
        let first = clauses[0].as_document().unwrap();
        let regex = first.get_document("title").unwrap();
        assert_eq!(regex.get_str("$regex").unwrap(), "plumb");
        assert_eq!(regex.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn free_text_is_regex_escaped() {
        let filter = build_filter(&params(&[("q", "a.c*")]), &["name"], doc! {});
        let clauses = filter.get_array("$or").unwrap();
        let regex = clauses[0].as_document().unwrap().get_document("name").unwrap();
        assert_eq!(regex.get_str("$regex").unwrap(), r"a\.c\*");
    }

    #[test]
    fn blank_search_is_ignored() {
        let filter = build_filter(&params(&[("q", "   ")]), &["name"], doc! {});
        assert!(filter.get("$or").is_none());
    }

    #[test]
    fn unreserved_params_become_exact_matches() {
        let filter = build_filter(
            &params(&[("category", "Cleaning"), ("page", "3"), ("limit", "5")]),
            &[],
            doc! {},
        );
        assert_eq!(filter.get_str("category").unwrap(), "Cleaning");
        assert!(filter.get("page").is_none());
        assert!(filter.get("limit").is_none());
    }

    #[test]
    fn scalar_coercion_handles_bools_and_ids() {
        let oid = ObjectId::new();
        let filter = build_filter(
            &params(&[("is_active", "true"), ("provider_id", &oid.to_hex())]),
            &[],
            doc! {},
        );
        assert_eq!(filter.get_bool("is_active").unwrap(), true);
        assert_eq!(filter.get_object_id("provider_id").unwrap(), oid);
    }

    #[test]
    fn default_filters_override_request_params() {
        let owner = ObjectId::new();
        let intruder = ObjectId::new();
        let filter = build_filter(
            &params(&[("posted_by", &intruder.to_hex())]),
            &[],
            doc! { "posted_by": owner },
        );
        assert_eq!(filter.get_object_id("posted_by").unwrap(), owner);
    }

    #[test]
    fn pagination_defaults() {
        let (page, limit, skip) = page_params(&params(&[]));
        assert_eq!((page, limit, skip), (1, DEFAULT_LIMIT, 0));
    }

    #[test]
    fn pagination_offsets() {
        let (page, limit, skip) = page_params(&params(&[("page", "2"), ("limit", "5")]));
        assert_eq!((page, limit, skip), (2, 5, 5));
    }

    #[test]
    fn pagination_clamps_bad_input() {
        let (page, limit, _) = page_params(&params(&[("page", "0"), ("limit", "9999")]));
        assert_eq!(page, 1);
        assert_eq!(limit, MAX_LIMIT);

        let (page, limit, _) = page_params(&params(&[("page", "-3"), ("limit", "junk")]));
        assert_eq!(page, 1);
        assert_eq!(limit, DEFAULT_LIMIT);
    }

    #[test]
    fn twelve_records_page_two_of_five() {
        // {page: 2, limit: 5} over 12 records selects records 6-10.
        let (page, limit, skip) = page_params(&params(&[("page", "2"), ("limit", "5")]));
        assert_eq!(skip, 5);
        let meta = Pagination::new(page, limit, 12);
        assert_eq!(
            meta,
            Pagination { page: 2, limit: 5, total: 12, pages: 3 }
        );
    }

    #[test]
    fn empty_result_set_has_zero_pages() {
        assert_eq!(Pagination::new(1, 10, 0).pages, 0);
    }

    #[test]
    fn sort_parsing() {
        assert_eq!(sort_spec(&params(&[])), doc! { "created_at": -1 });
        assert_eq!(sort_spec(&params(&[("sort", "title")])), doc! { "title": 1 });
        assert_eq!(sort_spec(&params(&[("sort", "-rating")])), doc! { "rating": -1 });
        assert_eq!(sort_spec(&params(&[("sort", "")])), doc! { "created_at": -1 });
    }
}
