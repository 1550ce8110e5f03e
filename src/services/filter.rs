//! Filter codec for request listings.
//!
//! A filter selection (price bounds, quantity bounds, status flags) is
//! carried between list-page round-trips as a compact string, e.g.
//! `p10-50;q0-10;sn,a`. Status letters follow the legacy single-letter
//! scheme: `n` new, `a` approved, `r` rejected.

use rust_decimal::Decimal;
use sea_orm::sea_query::Condition;
use sea_orm::ColumnTrait;
use serde::{Deserialize, Serialize};

use crate::entities::request::{self, RequestStatus};
use crate::errors::ServiceError;

/// Most filters combine a range with one or two statuses; more than two
/// status flags would select everything and is rejected as input noise.
pub const MAX_STATUS_FLAGS: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSelection {
    /// Inclusive total-price bounds.
    pub price: Option<(Decimal, Decimal)>,
    /// Inclusive quantity bounds.
    pub quantity: Option<(i32, i32)>,
    /// Status flags, at most [`MAX_STATUS_FLAGS`].
    pub statuses: Vec<RequestStatus>,
}

fn status_letter(status: RequestStatus) -> char {
    match status {
        RequestStatus::New => 'n',
        RequestStatus::Approved => 'a',
        RequestStatus::Rejected => 'r',
    }
}

fn status_from_letter(letter: &str) -> Option<RequestStatus> {
    match letter {
        "n" => Some(RequestStatus::New),
        "a" => Some(RequestStatus::Approved),
        "r" => Some(RequestStatus::Rejected),
        _ => None,
    }
}

impl FilterSelection {
    pub fn is_empty(&self) -> bool {
        self.price.is_none() && self.quantity.is_none() && self.statuses.is_empty()
    }

    /// Rejects selections the listing cannot honor.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.statuses.len() > MAX_STATUS_FLAGS {
            return Err(ServiceError::InvalidInput(format!(
                "At most {} status flags may be combined",
                MAX_STATUS_FLAGS
            )));
        }
        if let Some((min, max)) = self.price {
            if min > max {
                return Err(ServiceError::InvalidInput(format!(
                    "Price range {min}-{max} is inverted"
                )));
            }
        }
        if let Some((min, max)) = self.quantity {
            if min > max {
                return Err(ServiceError::InvalidInput(format!(
                    "Quantity range {min}-{max} is inverted"
                )));
            }
        }
        Ok(())
    }

    /// Renders the compact string form. `parse` inverts this exactly.
    pub fn encode(&self) -> String {
        let mut segments = Vec::new();
        if let Some((min, max)) = self.price {
            segments.push(format!("p{min}-{max}"));
        }
        if let Some((min, max)) = self.quantity {
            segments.push(format!("q{min}-{max}"));
        }
        if !self.statuses.is_empty() {
            let letters: Vec<String> = self
                .statuses
                .iter()
                .map(|s| status_letter(*s).to_string())
                .collect();
            segments.push(format!("s{}", letters.join(",")));
        }
        segments.join(";")
    }

    /// Parses the compact string form produced by [`encode`].
    pub fn parse(code: &str) -> Result<Self, ServiceError> {
        let mut selection = FilterSelection::default();

        for segment in code.split(';').filter(|s| !s.is_empty()) {
            // Segments are non-empty; the leading marker may still be any
            // byte sequence, so split on the first char, not on byte 1.
            let kind = segment.chars().next().expect("segment is non-empty");
            let rest = &segment[kind.len_utf8()..];
            match kind {
                'p' => {
                    let (min, max) = parse_range::<Decimal>(rest, segment)?;
                    selection.price = Some((min, max));
                }
                'q' => {
                    let (min, max) = parse_range::<i32>(rest, segment)?;
                    selection.quantity = Some((min, max));
                }
                's' => {
                    for letter in rest.split(',') {
                        let status = status_from_letter(letter).ok_or_else(|| {
                            ServiceError::InvalidInput(format!(
                                "Unknown status flag '{letter}' in filter"
                            ))
                        })?;
                        if !selection.statuses.contains(&status) {
                            selection.statuses.push(status);
                        }
                    }
                }
                _ => {
                    return Err(ServiceError::InvalidInput(format!(
                        "Unknown filter segment '{segment}'"
                    )))
                }
            }
        }

        selection.validate()?;
        Ok(selection)
    }

    /// Builds the store-level condition for the requests table.
    pub fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some((min, max)) = self.price {
            cond = cond.add(request::Column::PriceWithoutVat.between(min, max));
        }
        if let Some((min, max)) = self.quantity {
            cond = cond.add(request::Column::Quantity.between(min, max));
        }
        if !self.statuses.is_empty() {
            cond = cond.add(
                request::Column::Status.is_in(self.statuses.iter().map(|s| s.as_str())),
            );
        }
        cond
    }
}

fn parse_range<T: std::str::FromStr>(rest: &str, segment: &str) -> Result<(T, T), ServiceError> {
    let invalid =
        || ServiceError::InvalidInput(format!("Malformed range in filter segment '{segment}'"));

    let (min, max) = rest.split_once('-').ok_or_else(invalid)?;
    let min = min.parse::<T>().map_err(|_| invalid())?;
    let max = max.parse::<T>().map_err(|_| invalid())?;
    Ok((min, max))
}
