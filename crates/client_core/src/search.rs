use shared::domain::{Company, Event, JobOffer, Listing};

/// Fields a listing entry can be searched by.
pub trait Searchable {
    fn search_fields(&self) -> Vec<&str>;
}

impl Searchable for JobOffer {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.profession.as_str()]
    }
}

impl Searchable for Company {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.sector.as_str()]
    }
}

impl Searchable for Event {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str()]
    }
}

/// Case-insensitive substring match. A blank query matches everything.
pub fn matches_query(value: &str, query: &str) -> bool {
    let query = query.trim();
    query.is_empty() || value.to_lowercase().contains(&query.to_lowercase())
}

pub fn filter_listing<T>(listing: &Listing<T>, query: &str) -> Listing<T>
where
    T: Searchable + Clone,
{
    listing
        .iter()
        .filter(|(_, record)| {
            record
                .search_fields()
                .into_iter()
                .any(|field| matches_query(field, query))
        })
        .map(|(key, record)| (key.clone(), record.clone()))
        .collect()
}
