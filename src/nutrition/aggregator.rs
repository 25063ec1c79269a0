use super::types::{round1, DailyTotals};
use crate::logs::repo_types::FoodLogEntry;

/// Sums calories and macros over `entries`; an empty slice gives all zeros.
pub fn daily_totals(entries: &[FoodLogEntry]) -> DailyTotals {
    DailyTotals {
        calories: column_sum(entries, |e| e.total_calories),
        protein: column_sum(entries, |e| e.protein),
        carbs: column_sum(entries, |e| e.carbs),
        fat: column_sum(entries, |e| e.fat),
    }
}

// Values are added in sorted order so the float sum doesn't depend on how
// the caller ordered the entries.
fn column_sum(entries: &[FoodLogEntry], field: impl Fn(&FoodLogEntry) -> f64) -> f64 {
    let mut values: Vec<f64> = entries.iter().map(field).collect();
    values.sort_by(f64::total_cmp);
    round1(values.into_iter().sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use uuid::Uuid;

    fn entry(kcal: f64, protein: f64, carbs: f64, fat: f64) -> FoodLogEntry {
        FoodLogEntry {
            log_id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            food_name: "test".into(),
            calories_per_100g: kcal,
            weight_grams: 100.0,
            total_calories: kcal,
            protein,
            carbs,
            fat,
            image_key: None,
            logged_at: datetime!(2024-05-01 12:00 UTC),
        }
    }

    #[test]
    fn empty_day_is_all_zero() {
        assert_eq!(daily_totals(&[]), DailyTotals::default());
    }

    #[test]
    fn sums_each_column() {
        let totals = daily_totals(&[entry(195.0, 4.1, 42.3, 0.5), entry(247.5, 46.5, 0.0, 5.4)]);
        assert_eq!(totals.calories, 442.5);
        assert_eq!(totals.protein, 50.6);
        assert_eq!(totals.carbs, 42.3);
        assert_eq!(totals.fat, 5.9);
    }

    #[test]
    fn order_does_not_change_totals() {
        let mut entries = vec![
            entry(0.1, 0.7, 1e-3, 12.3),
            entry(1e6, 0.2, 33.3, 0.01),
            entry(0.3, 1e-9, 0.6, 7.7),
            entry(123.45, 9.99, 0.05, 0.15),
        ];
        let expected = daily_totals(&entries);
        entries.reverse();
        assert_eq!(daily_totals(&entries), expected);
        entries.swap(0, 2);
        entries.swap(1, 3);
        assert_eq!(daily_totals(&entries), expected);
    }
}
