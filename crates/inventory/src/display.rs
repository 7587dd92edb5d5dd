//! pt-BR display formatting for the stock table.

use chrono::NaiveDate;

/// Format an amount as Brazilian reais: `R$ 1.234,56`.
pub fn format_brl(amount: f64) -> String {
    if !amount.is_finite() {
        return "R$ -".to_string();
    }

    let cents = (amount.abs() * 100.0).round() as u64;
    let units = (cents / 100).to_string();
    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, ch) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}R$ {grouped},{:02}", cents % 100)
}

/// Format a date as `dd/mm/yyyy`.
pub fn format_date_br(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
