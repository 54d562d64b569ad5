use itertools::Itertools;
use std::cmp::Reverse;

use crate::listing::Listing;

/// Orders listings by price ascending, then bedrooms descending. The sort is stable, so listings
/// with the same price and bedroom count keep the order the store returned them in.
pub fn rank(listings: Vec<Listing>) -> Vec<Listing> {
    listings
        .into_iter()
        .sorted_by_key(|listing| (listing.price, Reverse(listing.bedrooms)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;

    fn listing(id: i64, price: u64, bedrooms: u64) -> Listing {
        Listing {
            id: id.into(),
            city: "Austin".to_string(),
            address: format!("{} Elm", id),
            price,
            bedrooms,
        }
    }

    fn ids(listings: &[Listing]) -> Vec<String> {
        listings.iter().map(|l| l.id.to_string()).collect()
    }

    #[test]
    fn price_then_bedrooms() {
        let ranked = rank(vec![
            listing(1, 1000, 2),
            listing(2, 800, 3),
            listing(3, 800, 4),
            listing(4, 500, 1),
        ]);

        assert_eq!(ids(&ranked), vec!["4", "3", "2", "1"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let ranked = rank(vec![
            listing(7, 900, 2),
            listing(3, 900, 2),
            listing(5, 100, 1),
            listing(1, 900, 2),
        ]);

        assert_eq!(ids(&ranked), vec!["5", "7", "3", "1"]);
    }

    #[test]
    fn empty() {
        assert!(rank(vec![]).is_empty());
    }

    #[test]
    fn shuffled_inputs_are_stable() {
        let mut rng = rand::thread_rng();

        for _ in 0..50 {
            let mut input: Vec<Listing> = (0..30)
                .map(|id| listing(id, (id as u64 % 4) * 100, id as u64 % 3))
                .collect();
            input.shuffle(&mut rng);

            let ranked = rank(input.clone());

            for pair in ranked.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                assert!(a.price <= b.price);
                if a.price == b.price {
                    assert!(a.bedrooms >= b.bedrooms);
                }
                if a.price == b.price && a.bedrooms == b.bedrooms {
                    let position = |l: &Listing| input.iter().position(|x| x == l).unwrap();
                    assert!(position(a) < position(b));
                }
            }
        }
    }
}
