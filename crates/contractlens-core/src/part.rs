//! Part and supplier records from the master file, plus derived pricing views.
//!
//! The master file is one wide row per part: identity columns, supplier
//! columns, and 72 monthly scalar columns named `vol<mon><year>` and
//! `price<mon><year>` for 2023–2025. A missing or zero monthly value means
//! "no data for that month", never a value of zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Years covered by the monthly volume/price columns.
pub const YEARS: [u16; 3] = [2023, 2024, 2025];

/// Year whose months are scanned first when looking for the latest price.
pub const CURRENT_PRICE_YEAR: u16 = 2025;

/// Fallback year scanned (December backwards) when the current year has no price.
pub const PREVIOUS_PRICE_YEAR: u16 = 2024;

/// Master-file key column.
pub const PART_NUMBER_COLUMN: &str = "PartNumber";

/// Supplier-name column, used for supplier-scoped queries.
pub const SUPPLIER_NAME_COLUMN: &str = "suppliername";

/// Identity and supplier columns requested on every lookup.
pub const IDENTITY_COLUMNS: &[&str] = &[
    "suppliernumber",
    SUPPLIER_NAME_COLUMN,
    "suppliercontactname",
    "suppliercontactemail",
    "suppliermanufacturinglocation",
    PART_NUMBER_COLUMN,
    "partname",
    "material",
    "currency",
];

/// Calendar month, lowercase three-letter names as used in column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Jan,
        Month::Feb,
        Month::Mar,
        Month::Apr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Aug,
        Month::Sep,
        Month::Oct,
        Month::Nov,
        Month::Dec,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jan => "jan",
            Self::Feb => "feb",
            Self::Mar => "mar",
            Self::Apr => "apr",
            Self::May => "may",
            Self::Jun => "jun",
            Self::Jul => "jul",
            Self::Aug => "aug",
            Self::Sep => "sep",
            Self::Oct => "oct",
            Self::Nov => "nov",
            Self::Dec => "dec",
        }
    }

    /// Month from a 1-based calendar number (1 = January).
    pub fn from_number(n: u32) -> Option<Month> {
        Month::ALL.get(n.checked_sub(1)? as usize).copied()
    }

    /// The current UTC calendar month.
    pub fn current() -> Month {
        use chrono::Datelike;
        Month::from_number(chrono::Utc::now().month()).unwrap_or(Month::Dec)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Which monthly series a column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    Volume,
    Price,
}

impl Series {
    fn prefix(&self) -> &'static str {
        match self {
            Self::Volume => "vol",
            Self::Price => "price",
        }
    }

    /// Column name for this series at `(month, year)`, e.g. `pricejun2024`.
    pub fn column(&self, month: Month, year: u16) -> String {
        format!("{}{}{}", self.prefix(), month.as_str(), year)
    }
}

/// Every column a part lookup requests: identity, then 36 volume and 36 price columns.
pub fn lookup_columns() -> Vec<String> {
    let mut cols: Vec<String> = IDENTITY_COLUMNS.iter().map(|c| c.to_string()).collect();
    for series in [Series::Volume, Series::Price] {
        for year in YEARS {
            for month in Month::ALL {
                cols.push(series.column(month, year));
            }
        }
    }
    cols
}

/// Raw monthly values keyed by `(year, month)`. Only positive values are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlySeries {
    values: BTreeMap<(u16, Month), f64>,
}

impl MonthlySeries {
    /// Record a value. Zero, negative and non-finite values are dropped.
    pub fn set(&mut self, year: u16, month: Month, value: f64) {
        if value.is_finite() && value > 0.0 {
            self.values.insert((year, month), value);
        }
    }

    pub fn get(&self, year: u16, month: Month) -> Option<f64> {
        self.values.get(&(year, month)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Year → month → value, with every covered year present.
    pub fn trend(&self) -> Trend {
        let mut years: BTreeMap<u16, BTreeMap<Month, f64>> =
            YEARS.iter().map(|y| (*y, BTreeMap::new())).collect();
        for ((year, month), value) in &self.values {
            years.entry(*year).or_default().insert(*month, *value);
        }
        Trend(years)
    }
}

/// Year → month → scalar. Months iterate in calendar order; months without
/// data are absent, not null.
///
/// Serialises as `{"2024": {"jan": 45, "mar": 3.25}}`, whole values as integers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trend(BTreeMap<u16, BTreeMap<Month, f64>>);

impl Trend {
    pub fn get(&self, year: u16, month: Month) -> Option<f64> {
        self.0.get(&year)?.get(&month).copied()
    }

    /// Months with data in `year`, January first.
    pub fn months(&self, year: u16) -> impl Iterator<Item = (Month, f64)> + '_ {
        self.0
            .get(&year)
            .into_iter()
            .flat_map(|m| m.iter().map(|(month, v)| (*month, *v)))
    }

    pub fn years(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }
}

impl Serialize for Trend {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        struct Months<'a>(&'a BTreeMap<Month, f64>);

        impl Serialize for Months<'_> {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (month, value) in self.0 {
                    map.serialize_entry(month.as_str(), &scalar_json(*value))?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (year, months) in &self.0 {
            map.serialize_entry(&year.to_string(), &Months(months))?;
        }
        map.end()
    }
}

/// Whole values as JSON integers, everything else as floats.
fn scalar_json(value: f64) -> Value {
    // Beyond 2^53 an f64 no longer holds every integer exactly.
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

/// Supplier attributes carried on each master-file row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInfo {
    pub name: String,
    pub number: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub manufacturing_location: Option<String>,
}

/// One part's static and time-series attributes, as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PartRecord {
    pub part_number: String,
    pub part_name: Option<String>,
    pub material: Option<String>,
    pub material2: Option<String>,
    pub currency: Option<String>,
    pub supplier: SupplierInfo,
    pub volumes: MonthlySeries,
    pub prices: MonthlySeries,
}

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("record is missing the {0} column")]
    MissingColumn(&'static str),
}

impl PartRecord {
    /// Build a record from one row keyed by master-file column name.
    ///
    /// Text columns accept strings or numbers; monthly columns accept numbers
    /// or numeric strings. Anything else is treated as absent.
    pub fn from_columns(row: &Map<String, Value>) -> Result<Self, RecordError> {
        let part_number = text(row, PART_NUMBER_COLUMN)
            .ok_or(RecordError::MissingColumn(PART_NUMBER_COLUMN))?;

        let supplier = SupplierInfo {
            name: text(row, SUPPLIER_NAME_COLUMN).unwrap_or_default(),
            number: text(row, "suppliernumber"),
            contact_name: text(row, "suppliercontactname"),
            contact_email: text(row, "suppliercontactemail"),
            manufacturing_location: text(row, "suppliermanufacturinglocation"),
        };

        let mut volumes = MonthlySeries::default();
        let mut prices = MonthlySeries::default();
        for year in YEARS {
            for month in Month::ALL {
                if let Some(v) = scalar(row, &Series::Volume.column(month, year)) {
                    volumes.set(year, month, v);
                }
                if let Some(v) = scalar(row, &Series::Price.column(month, year)) {
                    prices.set(year, month, v);
                }
            }
        }

        Ok(Self {
            part_number,
            part_name: text(row, "partname"),
            material: text(row, "material"),
            material2: text(row, "material2"),
            currency: text(row, "currency"),
            supplier,
            volumes,
            prices,
        })
    }
}

/// Most recent known price for a part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentPricing {
    pub latest_price: Option<f64>,
    /// `<mon><year>` label of the matched column, e.g. `jun2024`.
    pub latest_price_date: Option<String>,
    pub currency: Option<String>,
}

/// Latest non-zero price as of `as_of` in the current price year.
///
/// 2025 is scanned January → `as_of`, keeping the last hit. If nothing is
/// found, 2024 is scanned December → January, keeping the first hit.
pub fn current_pricing(record: &PartRecord, as_of: Month) -> CurrentPricing {
    let current = Month::ALL[..=as_of.index()]
        .iter()
        .filter_map(|m| {
            record
                .prices
                .get(CURRENT_PRICE_YEAR, *m)
                .map(|p| (p, *m, CURRENT_PRICE_YEAR))
        })
        .last();

    let hit = current.or_else(|| {
        Month::ALL.iter().rev().find_map(|m| {
            record
                .prices
                .get(PREVIOUS_PRICE_YEAR, *m)
                .map(|p| (p, *m, PREVIOUS_PRICE_YEAR))
        })
    });

    CurrentPricing {
        latest_price: hit.map(|(p, _, _)| p),
        latest_price_date: hit.map(|(_, m, y)| format!("{}{}", m.as_str(), y)),
        currency: record.currency.clone(),
    }
}

/// A part record together with its derived pricing and volume views.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub record: PartRecord,
    pub current_pricing: CurrentPricing,
    pub volume_trend: Trend,
    pub pricing_trend: Trend,
}

impl Part {
    /// Derive views with the latest-price scan bounded at `as_of`.
    pub fn derive(record: PartRecord, as_of: Month) -> Self {
        let current_pricing = current_pricing(&record, as_of);
        let volume_trend = record.volumes.trend();
        let pricing_trend = record.prices.trend();
        Self {
            record,
            current_pricing,
            volume_trend,
            pricing_trend,
        }
    }

    /// Derive views as of the current calendar month.
    pub fn from_record(record: PartRecord) -> Self {
        Self::derive(record, Month::current())
    }

    pub fn supplier(&self) -> &SupplierInfo {
        &self.record.supplier
    }
}

fn text(row: &Map<String, Value>, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn scalar(row: &Map<String, Value>, key: &str) -> Option<f64> {
    match row.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::debug!(column = key, value = %s, "ignoring non-numeric monthly value");
                None
            }
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(extra: Value) -> Map<String, Value> {
        let mut base = json!({
            "PartNumber": "PA-10183",
            "partname": "Hydraulic valve",
            "material": "Steel",
            "currency": "EUR",
            "suppliername": "Acme Corp",
            "suppliernumber": 4411,
            "suppliercontactname": "Jane Roe",
            "suppliercontactemail": "jane@acme.example",
            "suppliermanufacturinglocation": "Lyon, FR",
        });
        let obj = base.as_object_mut().unwrap();
        if let Value::Object(extra) = extra {
            obj.extend(extra);
        }
        obj.clone()
    }

    #[test]
    fn lookup_columns_cover_identity_and_72_monthly() {
        let cols = lookup_columns();
        assert_eq!(cols.len(), IDENTITY_COLUMNS.len() + 72);
        assert!(cols.contains(&"voljan2023".to_string()));
        assert!(cols.contains(&"pricedec2025".to_string()));
        assert_eq!(cols.iter().filter(|c| c.starts_with("vol")).count(), 36);
        assert_eq!(cols.iter().filter(|c| c.starts_with("price")).count(), 36);
    }

    #[test]
    fn from_columns_reads_identity_and_supplier() {
        let rec = PartRecord::from_columns(&row(json!({}))).unwrap();
        assert_eq!(rec.part_number, "PA-10183");
        assert_eq!(rec.part_name.as_deref(), Some("Hydraulic valve"));
        assert_eq!(rec.material2, None);
        assert_eq!(rec.supplier.name, "Acme Corp");
        assert_eq!(rec.supplier.number.as_deref(), Some("4411"));
        assert_eq!(rec.supplier.contact_email.as_deref(), Some("jane@acme.example"));
    }

    #[test]
    fn from_columns_requires_part_number() {
        let mut r = row(json!({}));
        r.remove("PartNumber");
        assert_eq!(
            PartRecord::from_columns(&r),
            Err(RecordError::MissingColumn("PartNumber"))
        );
    }

    #[test]
    fn latest_price_falls_back_to_previous_year() {
        let rec = PartRecord::from_columns(&row(json!({
            "pricejun2024": 120,
            "pricejan2025": 0,
            "pricefeb2025": null,
        })))
        .unwrap();
        let pricing = current_pricing(&rec, Month::Dec);
        assert_eq!(pricing.latest_price, Some(120.0));
        assert_eq!(pricing.latest_price_date.as_deref(), Some("jun2024"));
        assert_eq!(pricing.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn latest_price_prefers_latest_current_year_month() {
        let rec = PartRecord::from_columns(&row(json!({
            "pricejan2025": 10.5,
            "pricemar2025": 11.0,
            "pricemay2025": 12.0,
            "pricedec2024": 9.0,
        })))
        .unwrap();
        let pricing = current_pricing(&rec, Month::Apr);
        assert_eq!(pricing.latest_price, Some(11.0));
        assert_eq!(pricing.latest_price_date.as_deref(), Some("mar2025"));

        let pricing = current_pricing(&rec, Month::Dec);
        assert_eq!(pricing.latest_price_date.as_deref(), Some("may2025"));
    }

    #[test]
    fn previous_year_scan_takes_latest_month() {
        let rec = PartRecord::from_columns(&row(json!({
            "pricefeb2024": 7,
            "pricenov2024": 8,
        })))
        .unwrap();
        let pricing = current_pricing(&rec, Month::Jan);
        assert_eq!(pricing.latest_price_date.as_deref(), Some("nov2024"));
    }

    #[test]
    fn no_prices_yields_nulls() {
        let rec = PartRecord::from_columns(&row(json!({ "pricejan2023": 5 }))).unwrap();
        let pricing = current_pricing(&rec, Month::Dec);
        assert_eq!(pricing.latest_price, None);
        assert_eq!(pricing.latest_price_date, None);
    }

    #[test]
    fn trends_skip_zero_and_absent_months() {
        let rec = PartRecord::from_columns(&row(json!({
            "volmar2024": 45,
            "volapr2024": 0,
            "volmay2024": null,
            "pricejan2023": "3.25",
            "pricefeb2023": "n/a",
        })))
        .unwrap();
        let part = Part::derive(rec, Month::Jun);

        assert_eq!(part.volume_trend.get(2024, Month::Mar), Some(45.0));
        assert_eq!(part.volume_trend.get(2024, Month::Apr), None);
        assert_eq!(part.volume_trend.get(2024, Month::May), None);
        assert_eq!(part.volume_trend.months(2023).count(), 0);
        assert_eq!(part.volume_trend.months(2025).count(), 0);

        assert_eq!(part.pricing_trend.get(2023, Month::Jan), Some(3.25));
        assert_eq!(part.pricing_trend.get(2023, Month::Feb), None);
    }

    #[test]
    fn trend_months_in_calendar_order() {
        let rec = PartRecord::from_columns(&row(json!({
            "voldec2024": 9,
            "volapr2024": 4,
            "volaug2024": 8,
            "voljan2024": 1,
        })))
        .unwrap();
        let trend = rec.volumes.trend();
        let months: Vec<Month> = trend.months(2024).map(|(m, _)| m).collect();
        assert_eq!(months, [Month::Jan, Month::Apr, Month::Aug, Month::Dec]);
        assert_eq!(trend.years().collect::<Vec<_>>(), YEARS);
        assert!(!trend.is_empty());
    }

    #[test]
    fn trend_json_keeps_calendar_order_and_integers() {
        let rec = PartRecord::from_columns(&row(json!({
            "priceaug2024": 45,
            "priceapr2024": "3.25",
            "pricejan2024": 10,
        })))
        .unwrap();
        let text = serde_json::to_string(&rec.prices.trend()).unwrap();
        assert_eq!(
            text,
            r#"{"2023":{},"2024":{"jan":10,"apr":3.25,"aug":45},"2025":{}}"#
        );
    }

    #[test]
    fn month_from_number_bounds() {
        assert_eq!(Month::from_number(1), Some(Month::Jan));
        assert_eq!(Month::from_number(12), Some(Month::Dec));
        assert_eq!(Month::from_number(0), None);
        assert_eq!(Month::from_number(13), None);
    }
}
