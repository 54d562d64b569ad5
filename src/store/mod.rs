pub mod dataset;
pub mod server;

use std::sync::Arc;

use crate::listing::Listing;
use crate::protocol::{RawCommand, Response};

/// The listing store answers raw queries over an immutable, in-memory dataset. Clones share the
/// same dataset.
#[derive(Clone, Debug)]
pub struct ListingStore {
    listings: Arc<[Listing]>,
}

impl ListingStore {
    pub fn new(listings: Vec<Listing>) -> ListingStore {
        ListingStore {
            listings: listings.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn list_all(&self) -> Vec<Listing> {
        self.listings.to_vec()
    }

    /// Every listing in `city` (case-insensitive) priced at or below `max_price`, in dataset
    /// order.
    pub fn search(&self, city: &str, max_price: i64) -> Vec<Listing> {
        let city = city.to_lowercase();
        self.listings
            .iter()
            .filter(|listing| listing.city.to_lowercase() == city)
            .filter(|listing| i128::from(listing.price) <= i128::from(max_price))
            .cloned()
            .collect()
    }

    pub fn execute(&self, cmd: RawCommand) -> Response {
        match cmd {
            RawCommand::List => Response::Listings(self.list_all()),
            RawCommand::Search { city, max_price } => {
                Response::Listings(self.search(&city, max_price))
            }
        }
    }

    /// Parses and answers one raw command line. Commands that fail to parse are answered with an
    /// error payload.
    pub fn handle_line(&self, line: &str) -> Response {
        match RawCommand::parse(line) {
            Ok(cmd) => self.execute(cmd),
            Err(err) => Response::from(err),
        }
    }
}
