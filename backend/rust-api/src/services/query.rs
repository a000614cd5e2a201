//! Per-collection query tables: which query parameters filter, search and
//! order a listing, and how each maps onto a MongoDB predicate.

use anyhow::Context;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document, Regex};
use mongodb::Collection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::error::{ServiceError, ServiceResult};

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy)]
pub enum FilterKind {
    /// String equality restricted to a fixed set of values
    Choice(&'static [&'static str]),
    Bool,
    Int,
    /// Numeric lower bound (inclusive)
    Gte,
    /// Numeric upper bound (inclusive)
    Lte,
    ObjectId,
}

#[derive(Debug, Clone, Copy)]
pub struct FilterField {
    pub param: &'static str,
    pub field: &'static str,
    pub kind: FilterKind,
}

const fn filter(param: &'static str, field: &'static str, kind: FilterKind) -> FilterField {
    FilterField { param, field, kind }
}

#[derive(Debug, Clone, Copy)]
pub struct QueryTable {
    pub filters: &'static [FilterField],
    pub search: &'static [&'static str],
    /// (ordering param, stored field)
    pub ordering: &'static [(&'static str, &'static str)],
    pub default_ordering: &'static str,
}

/// Raw query string of a list request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ListParams(pub HashMap<String, String>);

impl ListParams {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn search_term(&self) -> Option<&str> {
        self.get("search")
    }
}

impl<const N: usize> From<[(&str, &str); N]> for ListParams {
    fn from(pairs: [(&str, &str); N]) -> Self {
        ListParams(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: u64,
}

/// List envelope returned by every collection endpoint
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: u64,
    pub limit: i64,
    pub offset: u64,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(count: u64, page: Page, results: Vec<T>) -> Self {
        Paginated {
            count,
            limit: page.limit,
            offset: page.offset,
            results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            count: self.count,
            limit: self.limit,
            offset: self.offset,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

impl QueryTable {
    pub fn build_filter(&self, params: &ListParams) -> ServiceResult<Document> {
        self.build_filter_with(params, Vec::new(), Vec::new())
    }

    /// Builds the predicate from declared filters and search fields, plus clauses
    /// the service resolved itself (related-entity filters, extra search targets).
    pub fn build_filter_with(
        &self,
        params: &ListParams,
        mut clauses: Vec<Document>,
        extra_search: Vec<Document>,
    ) -> ServiceResult<Document> {
        for field in self.filters {
            if let Some(raw) = params.get(field.param) {
                clauses.push(predicate(field, raw)?);
            }
        }

        if let Some(term) = params.search_term() {
            let mut any: Vec<Document> = self
                .search
                .iter()
                .map(|field| {
                    let mut clause = Document::new();
                    clause.insert(*field, contains_ignore_case(term));
                    clause
                })
                .collect();
            any.extend(extra_search);
            if !any.is_empty() {
                clauses.push(doc! { "$or": any });
            }
        }

        Ok(match clauses.len() {
            0 => Document::new(),
            1 => clauses.remove(0),
            _ => doc! { "$and": clauses },
        })
    }

    /// `ordering=-price,title`. Any unknown field falls back to the default ordering.
    pub fn sort(&self, params: &ListParams) -> Document {
        params
            .get("ordering")
            .and_then(|raw| self.parse_ordering(raw))
            .or_else(|| self.parse_ordering(self.default_ordering))
            .unwrap_or_default()
    }

    fn parse_ordering(&self, raw: &str) -> Option<Document> {
        let mut sort = Document::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, direction) = match part.strip_prefix('-') {
                Some(name) => (name, -1),
                None => (part, 1),
            };
            let field = self
                .ordering
                .iter()
                .find(|(param, _)| *param == name)
                .map(|(_, field)| *field)?;
            sort.insert(field, direction);
        }
        if sort.is_empty() {
            None
        } else {
            Some(sort)
        }
    }
}

pub fn page(params: &ListParams) -> ServiceResult<Page> {
    let limit = match params.get("limit") {
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| ServiceError::validation("limit", "A valid integer is required."))?,
        None => DEFAULT_LIMIT,
    };
    let offset = match params.get("offset") {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ServiceError::validation("offset", "A valid integer is required."))?,
        None => 0,
    };

    Ok(Page {
        limit: limit.clamp(1, MAX_LIMIT),
        offset,
    })
}

/// Runs a filtered, sorted, paginated find and the matching count.
pub async fn fetch_page<T>(
    collection: &Collection<T>,
    filter: Document,
    sort: Document,
    page: Page,
) -> ServiceResult<Paginated<T>>
where
    T: DeserializeOwned + Send + Sync,
{
    let count = collection
        .count_documents(filter.clone())
        .await
        .with_context(|| format!("Failed to count {}", collection.name()))?;

    let results: Vec<T> = collection
        .find(filter)
        .sort(sort)
        .skip(page.offset)
        .limit(page.limit)
        .await
        .with_context(|| format!("Failed to query {}", collection.name()))?
        .try_collect()
        .await
        .with_context(|| format!("Failed to read {}", collection.name()))?;

    Ok(Paginated::new(count, page, results))
}

/// Reads every document matching `filter`.
pub async fn fetch_all<T>(collection: &Collection<T>, filter: Document) -> ServiceResult<Vec<T>>
where
    T: DeserializeOwned + Send + Sync,
{
    let results = collection
        .find(filter)
        .await
        .with_context(|| format!("Failed to query {}", collection.name()))?
        .try_collect()
        .await
        .with_context(|| format!("Failed to read {}", collection.name()))?;
    Ok(results)
}

/// Case-insensitive substring match on user input
pub fn contains_ignore_case(term: &str) -> Regex {
    Regex {
        pattern: regex::escape(term),
        options: "i".to_string(),
    }
}

/// Case-insensitive whole-value match
pub fn equals_ignore_case(term: &str) -> Regex {
    Regex {
        pattern: format!("^{}$", regex::escape(term)),
        options: "i".to_string(),
    }
}

fn predicate(field: &FilterField, raw: &str) -> ServiceResult<Document> {
    let value: Bson = match field.kind {
        FilterKind::Choice(allowed) => {
            if !allowed.contains(&raw) {
                return Err(ServiceError::validation(
                    field.param,
                    format!(
                        "Select a valid choice. {} is not one of the available choices.",
                        raw
                    ),
                ));
            }
            Bson::String(raw.to_string())
        }
        FilterKind::Bool => Bson::Boolean(parse_bool(field.param, raw)?),
        FilterKind::Int => Bson::Int64(parse_number(field.param, raw)?),
        FilterKind::Gte => Bson::Document(doc! { "$gte": parse_float(field.param, raw)? }),
        FilterKind::Lte => Bson::Document(doc! { "$lte": parse_float(field.param, raw)? }),
        FilterKind::ObjectId => Bson::ObjectId(
            ObjectId::parse_str(raw)
                .map_err(|_| ServiceError::validation(field.param, "Enter a valid id."))?,
        ),
    };
    let mut clause = Document::new();
    clause.insert(field.field, value);
    Ok(clause)
}

fn parse_bool(param: &'static str, raw: &str) -> ServiceResult<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ServiceError::validation(param, "Enter a valid boolean.")),
    }
}

fn parse_number(param: &'static str, raw: &str) -> ServiceResult<i64> {
    raw.parse()
        .map_err(|_| ServiceError::validation(param, "Enter a whole number."))
}

fn parse_float(param: &'static str, raw: &str) -> ServiceResult<f64> {
    raw.parse()
        .map_err(|_| ServiceError::validation(param, "Enter a number."))
}

const LEVELS: &[&str] = &["elementary", "intermediate", "upper_intermediate", "advanced"];
const LANGUAGES: &[&str] = &["fa", "en"];

pub const CATEGORIES: QueryTable = QueryTable {
    filters: &[],
    search: &["title", "description"],
    ordering: &[("title", "title"), ("created_at", "createdAt")],
    default_ordering: "title",
};

/// `category` (title) and `author` (username) are resolved by the course service.
pub const COURSES: QueryTable = QueryTable {
    filters: &[
        filter("min_price", "price", FilterKind::Gte),
        filter("max_price", "price", FilterKind::Lte),
        filter("language", "language", FilterKind::Choice(LANGUAGES)),
        filter("level", "level", FilterKind::Choice(LEVELS)),
        filter("is_published", "is_published", FilterKind::Bool),
        filter("is_active", "is_active", FilterKind::Bool),
    ],
    search: &["title", "description"],
    ordering: &[
        ("title", "title"),
        ("created_at", "createdAt"),
        ("price", "price"),
        ("rating", "rating"),
    ],
    default_ordering: "-created_at",
};

pub const CHAPTERS: QueryTable = QueryTable {
    filters: &[
        filter("course", "course_id", FilterKind::ObjectId),
        filter("is_active", "is_active", FilterKind::Bool),
    ],
    search: &["title", "description"],
    ordering: &[("order", "order"), ("created_at", "createdAt")],
    default_ordering: "order",
};

pub const LESSONS: QueryTable = QueryTable {
    filters: &[
        filter("chapter", "chapter_id", FilterKind::ObjectId),
        filter("course", "course_id", FilterKind::ObjectId),
        filter("is_active", "is_active", FilterKind::Bool),
        filter("is_required", "is_required", FilterKind::Bool),
        filter("lesson_type", "lesson_type", FilterKind::Choice(&["lesson", "quiz"])),
    ],
    search: &["title", "description"],
    ordering: &[
        ("order", "order"),
        ("created_at", "createdAt"),
        ("duration", "duration"),
    ],
    default_ordering: "order",
};

const SLIDE_TYPES: &[&str] = &["text", "quiz", "video", "interactive"];

pub const SLIDES: QueryTable = QueryTable {
    filters: &[
        filter("lesson", "lesson_id", FilterKind::ObjectId),
        filter("chapter", "chapter_id", FilterKind::ObjectId),
        filter("course", "course_id", FilterKind::ObjectId),
        filter("is_active", "is_active", FilterKind::Bool),
        filter("is_required", "is_required", FilterKind::Bool),
        filter("type", "slide_type", FilterKind::Choice(SLIDE_TYPES)),
        filter("slide_type", "slide_type", FilterKind::Choice(SLIDE_TYPES)),
    ],
    search: &["title", "content"],
    ordering: &[("order", "order"), ("created_at", "createdAt")],
    default_ordering: "order",
};

pub const EDITORS: QueryTable = QueryTable {
    filters: &[filter("lang", "lang", FilterKind::Choice(&["py"]))],
    search: &["initial_code"],
    ordering: &[("created_at", "createdAt")],
    default_ordering: "-created_at",
};

pub const QUESTIONS: QueryTable = QueryTable {
    filters: &[
        filter(
            "question_type",
            "kind.type",
            FilterKind::Choice(&["single_choice", "multiple_choice", "text"]),
        ),
        filter("is_text_input", "is_text_input", FilterKind::Bool),
    ],
    search: &["title", "description"],
    ordering: &[("title", "title"), ("created_at", "createdAt")],
    default_ordering: "-created_at",
};

pub const CHOICES: QueryTable = QueryTable {
    filters: &[
        filter("question", "question_id", FilterKind::ObjectId),
        filter(
            "choice_type",
            "choice_type",
            FilterKind::Choice(&["text", "picture", "none", "all", "other"]),
        ),
        filter("is_correct", "is_correct", FilterKind::Bool),
        filter("hidden", "hidden", FilterKind::Bool),
    ],
    search: &["text"],
    ordering: &[("order", "order")],
    default_ordering: "order",
};

pub const USERS: QueryTable = QueryTable {
    filters: &[
        filter("type", "type", FilterKind::Choice(&["free", "pro"])),
        filter("level", "level", FilterKind::Choice(&["basic", "advanced"])),
        filter("is_active", "is_active", FilterKind::Bool),
        filter("is_confirmed", "is_confirmed", FilterKind::Bool),
        filter("is_staff", "is_staff", FilterKind::Bool),
    ],
    search: &["email", "username", "firstname", "lastname", "phone_number"],
    ordering: &[
        ("created_at", "createdAt"),
        ("email", "email"),
        ("username", "username"),
    ],
    default_ordering: "-created_at",
};

/// Author name search is resolved through the users collection by the author service.
pub const AUTHORS: QueryTable = QueryTable {
    filters: &[],
    search: &["bio"],
    ordering: &[("total_courses", "total_courses")],
    default_ordering: "-total_courses",
};

pub const STAFF: QueryTable = QueryTable {
    filters: &[filter(
        "role_type",
        "role_type",
        FilterKind::Choice(&["admin", "accounting", "support"]),
    )],
    search: &[],
    ordering: &[("role_type", "role_type")],
    default_ordering: "role_type",
};

pub const USER_COURSES: QueryTable = QueryTable {
    filters: &[
        filter("course", "course_id", FilterKind::ObjectId),
        filter("user", "user_id", FilterKind::ObjectId),
        filter("progress", "progress", FilterKind::Int),
    ],
    search: &[],
    ordering: &[
        ("progress", "progress"),
        ("score", "score"),
        ("rank", "rank"),
        ("created_at", "createdAt"),
    ],
    default_ordering: "-created_at",
};

pub const STREAKS: QueryTable = QueryTable {
    filters: &[
        filter("type", "type", FilterKind::Int),
        filter("user", "user_id", FilterKind::ObjectId),
    ],
    search: &[],
    ordering: &[
        ("current_streak", "current_streak"),
        ("highest_streak", "highest_streak"),
        ("last_interaction", "last_interaction"),
    ],
    default_ordering: "-current_streak",
};

pub const USER_RESPONSES: QueryTable = QueryTable {
    filters: &[
        filter("question", "question_id", FilterKind::ObjectId),
        filter("user", "user_id", FilterKind::ObjectId),
        filter("is_correct", "is_correct", FilterKind::Bool),
    ],
    search: &[],
    ordering: &[("submitted_at", "submittedAt")],
    default_ordering: "-submitted_at",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_range_combines_with_and() {
        let params = ListParams::from([("min_price", "10"), ("max_price", "99.5")]);
        let filter = COURSES.build_filter(&params).unwrap();

        let clauses = filter.get_array("$and").unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(
            clauses[0].as_document().unwrap(),
            &doc! { "price": { "$gte": 10.0 } }
        );
        assert_eq!(
            clauses[1].as_document().unwrap(),
            &doc! { "price": { "$lte": 99.5 } }
        );
    }

    #[test]
    fn single_clause_is_not_wrapped() {
        let params = ListParams::from([("is_active", "true")]);
        assert_eq!(
            CHAPTERS.build_filter(&params).unwrap(),
            doc! { "is_active": true }
        );
    }

    #[test]
    fn malformed_values_are_rejected() {
        let params = ListParams::from([("is_active", "maybe")]);
        assert!(matches!(
            CHAPTERS.build_filter(&params),
            Err(ServiceError::Validation { field: "is_active", .. })
        ));

        let params = ListParams::from([("course", "not-an-id")]);
        assert!(CHAPTERS.build_filter(&params).is_err());

        let params = ListParams::from([("level", "expert")]);
        assert!(COURSES.build_filter(&params).is_err());
    }

    #[test]
    fn search_escapes_regex_metacharacters() {
        let params = ListParams::from([("search", "c++ (intro)")]);
        let filter = CATEGORIES.build_filter(&params).unwrap();

        let any = filter.get_array("$or").unwrap();
        assert_eq!(any.len(), 2);
        let title = any[0].as_document().unwrap().get("title").unwrap();
        match title {
            Bson::RegularExpression(re) => {
                assert_eq!(re.pattern, r"c\+\+ \(intro\)");
                assert_eq!(re.options, "i");
            }
            other => panic!("unexpected search clause {:?}", other),
        }
    }

    #[test]
    fn extra_search_targets_join_the_or() {
        let params = ListParams::from([("search", "ada")]);
        let ids = vec![ObjectId::new()];
        let filter = AUTHORS
            .build_filter_with(&params, vec![], vec![doc! { "user_id": { "$in": ids } }])
            .unwrap();
        assert_eq!(filter.get_array("$or").unwrap().len(), 2);
    }

    #[test]
    fn ordering_accepts_known_fields_only() {
        let params = ListParams::from([("ordering", "-price,title")]);
        assert_eq!(COURSES.sort(&params), doc! { "price": -1, "title": 1 });

        let params = ListParams::from([("ordering", "password_hash")]);
        assert_eq!(COURSES.sort(&params), doc! { "createdAt": -1 });

        assert_eq!(CHAPTERS.sort(&ListParams::default()), doc! { "order": 1 });
    }

    #[test]
    fn page_defaults_and_bounds() {
        assert_eq!(
            page(&ListParams::default()).unwrap(),
            Page {
                limit: DEFAULT_LIMIT,
                offset: 0
            }
        );
        assert_eq!(
            page(&ListParams::from([("limit", "500"), ("offset", "20")])).unwrap(),
            Page {
                limit: MAX_LIMIT,
                offset: 20
            }
        );
        assert!(page(&ListParams::from([("limit", "ten")])).is_err());
    }

    #[test]
    fn question_type_filters_nested_tag() {
        let params = ListParams::from([("question_type", "text")]);
        assert_eq!(
            QUESTIONS.build_filter(&params).unwrap(),
            doc! { "kind.type": "text" }
        );
    }
}
