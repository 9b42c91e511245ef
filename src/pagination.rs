use serde::{Deserialize, Serialize};

/// Query-string parameters shared by the paginated list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
    #[serde(default = "default_page")]
    pub page: i64,
}
fn default_per_page() -> i64 {
    10
}
fn default_page() -> i64 {
    1
}

impl ListParams {
    pub fn limit(&self) -> i64 {
        self.per_page.clamp(1, 100)
    }

    pub fn current_page(&self) -> i64 {
        self.page.max(1)
    }

    pub fn offset(&self) -> i64 {
        (self.current_page() - 1) * self.limit()
    }

    /// Sort column restricted to an allow-list; anything else falls back to `id`.
    pub fn sort_column(&self, allowed: &[&'static str]) -> &'static str {
        self.sort_by
            .as_deref()
            .and_then(|requested| allowed.iter().find(|col| **col == requested))
            .copied()
            .unwrap_or("id")
    }

    pub fn sort_direction(&self) -> &'static str {
        match self.sort_order.as_deref() {
            Some(order) if order.eq_ignore_ascii_case("desc") => "DESC",
            _ => "ASC",
        }
    }

    /// `%term%` pattern for ILIKE searches, `None` when blank.
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"))
    }
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub current_page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_page: i64,
}

impl PageMeta {
    pub fn new(params: &ListParams, total: i64) -> Self {
        let per_page = params.limit();
        Self {
            current_page: params.current_page(),
            per_page,
            total,
            total_page: (total + per_page - 1) / per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(per_page: i64, page: i64) -> ListParams {
        ListParams {
            search: None,
            sort_by: None,
            sort_order: None,
            per_page,
            page,
        }
    }

    #[test]
    fn clamps_page_and_per_page() {
        let p = params(0, -3);
        assert_eq!(p.limit(), 1);
        assert_eq!(p.current_page(), 1);
        assert_eq!(p.offset(), 0);

        let p = params(500, 3);
        assert_eq!(p.limit(), 100);
        assert_eq!(p.offset(), 200);
    }

    #[test]
    fn sort_column_falls_back_to_id() {
        let mut p = params(10, 1);
        p.sort_by = Some("price".into());
        assert_eq!(p.sort_column(&["id", "name", "price"]), "price");

        p.sort_by = Some("password_hash".into());
        assert_eq!(p.sort_column(&["id", "name", "price"]), "id");

        p.sort_by = None;
        assert_eq!(p.sort_column(&["id", "name", "price"]), "id");
    }

    #[test]
    fn sort_direction_defaults_to_asc() {
        let mut p = params(10, 1);
        assert_eq!(p.sort_direction(), "ASC");
        p.sort_order = Some("DESC".into());
        assert_eq!(p.sort_direction(), "DESC");
        p.sort_order = Some("sideways".into());
        assert_eq!(p.sort_direction(), "ASC");
    }

    #[test]
    fn search_pattern_skips_blank() {
        let mut p = params(10, 1);
        p.search = Some("   ".into());
        assert_eq!(p.search_pattern(), None);
        p.search = Some("kopi".into());
        assert_eq!(p.search_pattern(), Some("%kopi%".into()));
    }

    #[test]
    fn meta_rounds_total_pages_up() {
        let meta = PageMeta::new(&params(10, 2), 25);
        assert_eq!(meta.total_page, 3);
        assert_eq!(meta.current_page, 2);

        let empty = PageMeta::new(&params(10, 1), 0);
        assert_eq!(empty.total_page, 0);
    }
}
