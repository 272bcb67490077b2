//! Pure aggregation over a user's expense and income entries.
//!
//! Nothing here touches storage; callers load the entries and pass a
//! reference date so results are reproducible.

use std::{cmp::Ordering, collections::HashMap};

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::Serialize;
use time::{Date, Month};

use crate::records::repo_types::{Category, Entry, EntryKind, DEFAULT_CATEGORIES, FALLBACK_COLOR};

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const WEEKS: usize = 4;
pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    pub name: &'static str,
    pub income: Decimal,
    pub expense: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySlice {
    pub name: String,
    pub value: Decimal,
    pub color: String,
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekBucket {
    pub name: String,
    pub income: Decimal,
    pub expense: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentTransaction {
    #[serde(flatten)]
    pub entry: Entry,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_balance: Decimal,
    pub monthly_income: Decimal,
    pub monthly_expenses: Decimal,
    pub savings: Decimal,
    pub monthly_series: Vec<MonthlyPoint>,
    pub recent_transactions: Vec<RecentTransaction>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub year: i32,
    pub month: u8,
    pub category_breakdown: Vec<CategorySlice>,
    pub weekly_breakdown: Vec<WeekBucket>,
}

/// Category name to display color. User categories win over the defaults.
#[derive(Debug, Clone)]
pub struct Palette(HashMap<String, String>);

impl Palette {
    pub fn new(user_categories: &[Category]) -> Self {
        let mut colors: HashMap<String, String> = DEFAULT_CATEGORIES
            .iter()
            .map(|c| (c.name.to_string(), c.color.to_string()))
            .collect();
        for c in user_categories {
            colors.insert(c.name.clone(), c.color.clone());
        }
        Self(colors)
    }

    pub fn color(&self, category: &str) -> &str {
        self.0.get(category).map(String::as_str).unwrap_or(FALLBACK_COLOR)
    }
}

fn sum<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Decimal {
    entries.into_iter().map(|e| e.amount).sum()
}

fn in_month(e: &Entry, year: i32, month: Month) -> bool {
    e.date.year() == year && e.date.month() == month
}

/// All income minus all expenses, plus the salary once.
pub fn total_balance(expenses: &[Entry], income: &[Entry], salary: Decimal) -> Decimal {
    sum(income) - sum(expenses) + salary
}

/// Income (salary included) and expenses for one calendar month.
pub fn month_totals(
    expenses: &[Entry],
    income: &[Entry],
    salary: Decimal,
    year: i32,
    month: Month,
) -> (Decimal, Decimal) {
    let inc = sum(income.iter().filter(|e| in_month(e, year, month))) + salary;
    let exp = sum(expenses.iter().filter(|e| in_month(e, year, month)));
    (inc, exp)
}

/// Twelve buckets keyed by month of year. Entries from different years
/// share a bucket, and the salary is added to every bucket.
pub fn monthly_series(expenses: &[Entry], income: &[Entry], salary: Decimal) -> Vec<MonthlyPoint> {
    let mut points: Vec<MonthlyPoint> = MONTH_LABELS
        .iter()
        .map(|&name| MonthlyPoint {
            name,
            income: salary,
            expense: Decimal::ZERO,
        })
        .collect();
    for e in income {
        points[month_index(e.date)].income += e.amount;
    }
    for e in expenses {
        points[month_index(e.date)].expense += e.amount;
    }
    points
}

fn month_index(date: Date) -> usize {
    usize::from(u8::from(date.month())) - 1
}

/// Expenses grouped by category, largest first.
pub fn category_breakdown(expenses: &[Entry], palette: &Palette) -> Vec<CategorySlice> {
    let mut totals: HashMap<&str, Decimal> = HashMap::new();
    for e in expenses {
        *totals.entry(e.category.as_str()).or_default() += e.amount;
    }
    let total: Decimal = totals.values().copied().sum();

    let mut slices: Vec<CategorySlice> = totals
        .into_iter()
        .map(|(name, value)| CategorySlice {
            name: name.to_string(),
            value,
            color: palette.color(name).to_string(),
            percent: percent_of(value, total),
        })
        .collect();
    slices.sort_by(|a, b| match b.value.cmp(&a.value) {
        Ordering::Equal => a.name.cmp(&b.name),
        other => other,
    });
    slices
}

fn percent_of(value: Decimal, total: Decimal) -> u32 {
    if total.is_zero() {
        return 0;
    }
    (value * Decimal::ONE_HUNDRED / total)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0)
}

/// Week index within a month; days 29 to 31 fold into the fourth week.
pub fn week_index(day: u8) -> usize {
    (usize::from(day.saturating_sub(1)) / 7).min(WEEKS - 1)
}

pub fn weekly_breakdown(
    expenses: &[Entry],
    income: &[Entry],
    year: i32,
    month: Month,
) -> Vec<WeekBucket> {
    let mut buckets: Vec<WeekBucket> = (1..=WEEKS)
        .map(|n| WeekBucket {
            name: format!("Week {n}"),
            income: Decimal::ZERO,
            expense: Decimal::ZERO,
        })
        .collect();
    for e in income.iter().filter(|e| in_month(e, year, month)) {
        buckets[week_index(e.date.day())].income += e.amount;
    }
    for e in expenses.iter().filter(|e| in_month(e, year, month)) {
        buckets[week_index(e.date.day())].expense += e.amount;
    }
    buckets
}

/// The newest entries of either kind, by date then insertion time.
pub fn recent_transactions(expenses: &[Entry], income: &[Entry], limit: usize) -> Vec<RecentTransaction> {
    let mut all: Vec<RecentTransaction> = expenses
        .iter()
        .map(|e| (e, EntryKind::Expense))
        .chain(income.iter().map(|e| (e, EntryKind::Income)))
        .map(|(e, kind)| RecentTransaction {
            entry: e.clone(),
            kind,
        })
        .collect();
    all.sort_by(|a, b| {
        b.entry
            .date
            .cmp(&a.entry.date)
            .then_with(|| b.entry.created_at.cmp(&a.entry.created_at))
    });
    all.truncate(limit);
    all
}

pub fn dashboard(expenses: &[Entry], income: &[Entry], salary: Decimal, today: Date) -> Dashboard {
    let (monthly_income, monthly_expenses) =
        month_totals(expenses, income, salary, today.year(), today.month());
    Dashboard {
        total_balance: total_balance(expenses, income, salary),
        monthly_income,
        monthly_expenses,
        savings: monthly_income - monthly_expenses,
        monthly_series: monthly_series(expenses, income, salary),
        recent_transactions: recent_transactions(expenses, income, RECENT_LIMIT),
    }
}

pub fn summary(
    expenses: &[Entry],
    income: &[Entry],
    palette: &Palette,
    year: i32,
    month: Month,
) -> Summary {
    let month_expenses: Vec<Entry> = expenses
        .iter()
        .filter(|e| in_month(e, year, month))
        .cloned()
        .collect();
    Summary {
        year,
        month: u8::from(month),
        category_breakdown: category_breakdown(&month_expenses, palette),
        weekly_breakdown: weekly_breakdown(expenses, income, year, month),
    }
}
