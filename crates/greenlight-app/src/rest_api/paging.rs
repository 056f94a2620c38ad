use greenlight_dal::{filters::validate_filters, Filters, SortSafelist};
use greenlight_types::Violations;

/// Raw listing parameters of the query string.
///
/// Numbers are kept as text so a malformed value becomes a field violation
/// rather than a rejected request.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Paging {
    title: Option<String>,
    genres: Option<String>,
    page: Option<String>,
    page_size: Option<String>,
    sort: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Listing {
    pub title: String,
    pub genres: Vec<String>,
    pub filters: Filters,
}

fn read_int(value: Option<&str>, default: i64, field: &str, violations: &mut Violations) -> i64 {
    match value {
        None | Some("") => default,
        Some(s) => match s.parse::<i64>() {
            Ok(v) => v,
            Err(_) => {
                violations.add(field, "must be an integer value");
                default
            }
        },
    }
}

fn read_csv(value: Option<&str>) -> Vec<String> {
    match value {
        None | Some("") => Vec::new(),
        Some(s) => s
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(String::from)
            .collect(),
    }
}

impl Paging {
    pub fn into_listing(
        self,
        default_page_size: i64,
        sort_safelist: SortSafelist,
    ) -> Result<Listing, Violations> {
        let mut violations = Violations::new();
        let page = read_int(self.page.as_deref(), 1, "page", &mut violations);
        let page_size = read_int(
            self.page_size.as_deref(),
            default_page_size,
            "page_size",
            &mut violations,
        );
        let sort = match self.sort {
            Some(s) if !s.is_empty() => s,
            _ => "id".to_string(),
        };

        let filters = Filters::new(page, page_size, sort).with_sort_safelist(sort_safelist);
        violations.merge(validate_filters(&filters));
        violations.into_result()?;

        Ok(Listing {
            title: self.title.unwrap_or_default(),
            genres: read_csv(self.genres.as_deref()),
            filters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paging(pairs: &[(&str, &str)]) -> Paging {
        let mut p = Paging::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "title" => p.title = v,
                "genres" => p.genres = v,
                "page" => p.page = v,
                "page_size" => p.page_size = v,
                "sort" => p.sort = v,
                _ => unreachable!(),
            }
        }
        p
    }

    #[test]
    fn test_defaults() {
        let listing = Paging::default()
            .into_listing(20, SortSafelist::movies())
            .unwrap();
        assert_eq!(listing.title, "");
        assert!(listing.genres.is_empty());
        assert_eq!(listing.filters.page, 1);
        assert_eq!(listing.filters.page_size, 20);
        assert_eq!(listing.filters.sort, "id");
    }

    #[test]
    fn test_parse_values() {
        let listing = paging(&[
            ("title", "the club"),
            ("genres", "drama,comedy"),
            ("page", "2"),
            ("page_size", "5"),
            ("sort", "-year"),
        ])
        .into_listing(20, SortSafelist::movies())
        .unwrap();
        assert_eq!(listing.title, "the club");
        assert_eq!(listing.genres, ["drama", "comedy"]);
        assert_eq!(listing.filters.offset(), 5);
        assert_eq!(listing.filters.order().unwrap().to_string(), "year DESC");
    }

    #[test]
    fn test_violations() {
        let violations = paging(&[("page", "abc"), ("page_size", "1000"), ("sort", "rating")])
            .into_listing(20, SortSafelist::movies())
            .unwrap_err();
        assert_eq!(violations.get("page"), Some("must be an integer value"));
        assert_eq!(violations.get("page_size"), Some("must be a maximum of 100"));
        assert_eq!(violations.get("sort"), Some("invalid sort value"));

        let violations = paging(&[("page", "0")])
            .into_listing(20, SortSafelist::movies())
            .unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations.get("page"), Some("must be greater than zero"));
    }
}
