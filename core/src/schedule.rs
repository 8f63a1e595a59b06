// kibbledrop_core/src/schedule.rs

//! Subscription frequencies and the delivery-date scheduler.
//!
//! All date arithmetic is done synchronously inside the request that triggers
//! it; `next_delivery` is a stored annotation, not a timer. The rules:
//!
//!  - weekly +7 days, bi-weekly +14, tri-weekly +21, monthly (and anything
//!    unrecognized) +1 calendar month;
//!  - a skip anchors at the previous `next_delivery` and records the skipped
//!    date as an ISO string;
//!  - a frequency change anchors at today;
//!  - an explicit custom date overrides the computed value unconditionally.

use crate::error::{DomainError, DomainResult};
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
  Weekly,
  BiWeekly,
  TriWeekly,
  Monthly,
  Custom,
}

impl Frequency {
  pub fn as_str(&self) -> &'static str {
    match self {
      Frequency::Weekly => "weekly",
      Frequency::BiWeekly => "bi-weekly",
      Frequency::TriWeekly => "tri-weekly",
      Frequency::Monthly => "monthly",
      Frequency::Custom => "custom",
    }
  }
}

impl FromStr for Frequency {
  type Err = DomainError;

  fn from_str(s: &str) -> DomainResult<Self> {
    match s {
      "weekly" => Ok(Frequency::Weekly),
      "bi-weekly" | "biweekly" => Ok(Frequency::BiWeekly),
      "tri-weekly" | "triweekly" => Ok(Frequency::TriWeekly),
      "monthly" => Ok(Frequency::Monthly),
      "custom" => Ok(Frequency::Custom),
      other => Err(DomainError::InvalidFrequency(other.to_string())),
    }
  }
}

impl fmt::Display for Frequency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
  Pending,
  Active,
  Canceled,
}

impl SubscriptionStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      SubscriptionStatus::Pending => "pending",
      SubscriptionStatus::Active => "active",
      SubscriptionStatus::Canceled => "canceled",
    }
  }
}

impl FromStr for SubscriptionStatus {
  type Err = DomainError;

  fn from_str(s: &str) -> DomainResult<Self> {
    match s {
      "pending" => Ok(SubscriptionStatus::Pending),
      "active" => Ok(SubscriptionStatus::Active),
      "canceled" | "cancelled" => Ok(SubscriptionStatus::Canceled),
      other => Err(DomainError::UnknownSubscriptionStatus(other.to_string())),
    }
  }
}

impl fmt::Display for SubscriptionStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Next delivery date for `frequency`, anchored at `anchor`.
///
/// Monthly (and `Custom`, when no explicit date accompanies it) advances one
/// calendar month; chrono clamps month-end overflow (Jan 31 -> Feb 28/29).
pub fn next_delivery_after(frequency: Frequency, anchor: NaiveDate) -> NaiveDate {
  match frequency {
    Frequency::Weekly => anchor + Days::new(7),
    Frequency::BiWeekly => anchor + Days::new(14),
    Frequency::TriWeekly => anchor + Days::new(21),
    Frequency::Monthly | Frequency::Custom => anchor
      .checked_add_months(Months::new(1))
      .unwrap_or(anchor + Days::new(30)),
  }
}

/// The schedulable slice of a subscription row: the next delivery date plus
/// the ordered skip list of ISO date strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySchedule {
  pub next_delivery: NaiveDate,
  pub skipped: Vec<String>,
}

impl DeliverySchedule {
  pub fn new(next_delivery: NaiveDate) -> Self {
    Self {
      next_delivery,
      skipped: Vec::new(),
    }
  }

  /// Defers the next delivery by one interval, recording the skipped date.
  pub fn skip(&mut self, frequency: Frequency) {
    let skipped_date = self.next_delivery;
    self.skipped.push(skipped_date.format("%Y-%m-%d").to_string());
    self.next_delivery = next_delivery_after(frequency, skipped_date);
    tracing::debug!(
      skipped = %skipped_date,
      next = %self.next_delivery,
      "Delivery skipped and rescheduled."
    );
  }

  /// Applies a frequency change: the new interval counts from `today`, not
  /// from the previously scheduled date.
  pub fn change_frequency(&mut self, frequency: Frequency, today: NaiveDate) {
    self.next_delivery = next_delivery_after(frequency, today);
  }

  /// An explicit custom date wins over anything computed.
  pub fn set_custom(&mut self, date: NaiveDate) {
    self.next_delivery = date;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn frequency_round_trip() {
    for freq in [
      Frequency::Weekly,
      Frequency::BiWeekly,
      Frequency::TriWeekly,
      Frequency::Monthly,
      Frequency::Custom,
    ] {
      assert_eq!(freq.as_str().parse::<Frequency>().unwrap(), freq);
    }
    assert_eq!("biweekly".parse::<Frequency>().unwrap(), Frequency::BiWeekly);
    assert!("fortnightly".parse::<Frequency>().is_err());
  }

  #[test]
  fn interval_arithmetic() {
    let anchor = date(2024, 3, 1);
    assert_eq!(next_delivery_after(Frequency::Weekly, anchor), date(2024, 3, 8));
    assert_eq!(next_delivery_after(Frequency::BiWeekly, anchor), date(2024, 3, 15));
    assert_eq!(next_delivery_after(Frequency::TriWeekly, anchor), date(2024, 3, 22));
    assert_eq!(next_delivery_after(Frequency::Monthly, anchor), date(2024, 4, 1));
  }

  #[test]
  fn monthly_clamps_month_end() {
    assert_eq!(
      next_delivery_after(Frequency::Monthly, date(2024, 1, 31)),
      date(2024, 2, 29)
    );
    assert_eq!(
      next_delivery_after(Frequency::Monthly, date(2023, 1, 31)),
      date(2023, 2, 28)
    );
  }

  #[test]
  fn skip_records_iso_date_and_anchors_at_skipped_date() {
    let mut schedule = DeliverySchedule::new(date(2024, 5, 10));
    schedule.skip(Frequency::Weekly);

    assert_eq!(schedule.skipped, vec!["2024-05-10".to_string()]);
    assert_eq!(schedule.next_delivery, date(2024, 5, 17));

    schedule.skip(Frequency::Weekly);
    assert_eq!(
      schedule.skipped,
      vec!["2024-05-10".to_string(), "2024-05-17".to_string()]
    );
    assert_eq!(schedule.next_delivery, date(2024, 5, 24));
  }

  #[test]
  fn frequency_change_anchors_at_today() {
    let mut schedule = DeliverySchedule::new(date(2024, 8, 1));
    let today = date(2024, 7, 3);
    schedule.change_frequency(Frequency::Weekly, today);
    // Not the previously scheduled date + 7: today + 7.
    assert_eq!(schedule.next_delivery, date(2024, 7, 10));
  }

  #[test]
  fn custom_date_overrides_unconditionally() {
    let mut schedule = DeliverySchedule::new(date(2024, 8, 1));
    schedule.skip(Frequency::Monthly);
    schedule.set_custom(date(2024, 12, 24));
    assert_eq!(schedule.next_delivery, date(2024, 12, 24));
    // The skip history survives a custom override.
    assert_eq!(schedule.skipped, vec!["2024-08-01".to_string()]);
  }
}
