//! Canonical formatting for reviewed field values. Every function is pure
//! and idempotent: re-formatting already-formatted output is a no-op, so the
//! same routine runs on raw OCR output and on every user edit.

use crate::types::{DocumentFields, LineItem};

/// CNPJ: digits only, truncated to 14, grouped as `NN.NNN.NNN/NNNN-NN`.
/// Shorter input formats partially (separators appear only once the next
/// digit group is started).
pub fn format_cnpj(raw: &str) -> String {
    let mut out = String::with_capacity(18);
    for (i, c) in raw
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(14)
        .enumerate()
    {
        match i {
            2 | 5 => out.push('.'),
            8 => out.push('/'),
            12 => out.push('-'),
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Issue date: digits only, truncated to 8, grouped as `DD/MM/YYYY`.
pub fn format_date(raw: &str) -> String {
    let mut out = String::with_capacity(10);
    for (i, c) in raw
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(8)
        .enumerate()
    {
        if i == 2 || i == 4 {
            out.push('/');
        }
        out.push(c);
    }
    out
}

/// Monetary/quantity values: strip everything but digits and commas, then
/// keep only the final comma as the decimal separator ("1,234,56" becomes
/// "1234,56").
pub fn format_number(raw: &str) -> String {
    let kept: Vec<char> = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .collect();
    let last_comma = kept.iter().rposition(|c| *c == ',');
    kept.iter()
        .enumerate()
        .filter(|(i, c)| **c != ',' || Some(*i) == last_comma)
        .map(|(_, c)| *c)
        .collect()
}

/// Route a field edit through the formatter for its key. Overflow keys have
/// no format class and are stored verbatim.
pub fn format_field(key: &str, value: &str) -> String {
    match key {
        "cnpj" => format_cnpj(value),
        "data_emissao" => format_date(value),
        "valor_total" => format_number(value),
        _ => value.to_string(),
    }
}

/// Route a line-item edit through the formatter for its key.
pub fn format_item_field(key: &str, value: &str) -> String {
    match key {
        "quantidade" | "preco_total" => format_number(value),
        _ => value.to_string(),
    }
}

/// Bring a freshly parsed scan response into canonical display format.
pub fn normalize_fields(fields: &mut DocumentFields) {
    fields.cnpj = format_cnpj(&fields.cnpj);
    fields.data_emissao = format_date(&fields.data_emissao);
    fields.valor_total = format_number(&fields.valor_total);
}

pub fn normalize_item(item: &mut LineItem) {
    item.quantidade = format_number(&item.quantidade);
    item.preco_total = format_number(&item.preco_total);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cnpj_full_length() {
        assert_eq!(format_cnpj("12345678000199"), "12.345.678/0001-99");
    }

    #[test]
    fn cnpj_strips_noise_and_truncates() {
        assert_eq!(format_cnpj("12.345.678/0001-99"), "12.345.678/0001-99");
        assert_eq!(format_cnpj("12345678000199999"), "12.345.678/0001-99");
        assert_eq!(format_cnpj("ab12cd34"), "12.34");
    }

    #[test]
    fn cnpj_partial_input() {
        assert_eq!(format_cnpj(""), "");
        assert_eq!(format_cnpj("1"), "1");
        assert_eq!(format_cnpj("12"), "12");
        assert_eq!(format_cnpj("123"), "12.3");
        assert_eq!(format_cnpj("123456789"), "12.345.678/9");
    }

    #[test]
    fn cnpj_idempotent() {
        let once = format_cnpj("12345678000199");
        assert_eq!(format_cnpj(&once), once);
        let partial = format_cnpj("12345");
        assert_eq!(format_cnpj(&partial), partial);
    }

    #[test]
    fn date_full_and_partial() {
        assert_eq!(format_date("01012024"), "01/01/2024");
        assert_eq!(format_date("0101"), "01/01");
        assert_eq!(format_date("010"), "01/0");
        assert_eq!(format_date(""), "");
        assert_eq!(format_date("01-01-2024 extra"), "01/01/2024");
    }

    #[test]
    fn date_idempotent() {
        let once = format_date("01012024");
        assert_eq!(format_date(&once), once);
    }

    #[test]
    fn number_keeps_last_comma_only() {
        assert_eq!(format_number("1,234,56"), "1234,56");
        assert_eq!(format_number("1,2,3,4"), "123,4");
    }

    #[test]
    fn number_strips_currency_noise() {
        // Dots are not decimal separators here; they are stripped outright.
        assert_eq!(format_number("R$ 1.234,56"), "1234,56");
        assert_eq!(format_number("12,00"), "12,00");
        assert_eq!(format_number("abc"), "");
    }

    #[test]
    fn number_idempotent() {
        let once = format_number("1,234,56");
        assert_eq!(format_number(&once), once);
    }

    #[test]
    fn field_routing() {
        assert_eq!(format_field("cnpj", "12345678000199"), "12.345.678/0001-99");
        assert_eq!(format_field("data_emissao", "01012024"), "01/01/2024");
        assert_eq!(format_field("valor_total", "1,234,56"), "1234,56");
        assert_eq!(format_field("observacao", "as typed"), "as typed");
        assert_eq!(format_item_field("quantidade", "2,0"), "2,0");
        assert_eq!(format_item_field("descricao", "Caixa 12x"), "Caixa 12x");
    }
}
