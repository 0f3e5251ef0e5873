//! Table views for rule results and the data overview.

use maud::{Markup, html};

use crate::{
    html::{TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE},
    table::{Table, Value},
};

const NULL_CELL_STYLE: &str = "italic text-gray-400 dark:text-gray-500";
const NUMBER_CELL_STYLE: &str = "text-right tabular-nums";

/// Renders `table` with one header cell per column and one row per record.
///
/// Tables without rows show `empty_message` instead of an empty body.
pub(super) fn result_table_view(table: &Table, empty_message: &str) -> Markup {
    html! {
        div class="relative overflow-x-auto max-h-[32rem] overflow-y-auto rounded-lg shadow" {
            table class="w-full text-sm text-left text-gray-500 dark:text-gray-400" {
                thead class={(TABLE_HEADER_STYLE) " sticky top-0"} {
                    tr {
                        @for column in &table.columns {
                            th scope="col" class="px-6 py-3 whitespace-nowrap" { (column) }
                        }
                    }
                }
                tbody {
                    @if table.is_empty() {
                        tr class=(TABLE_ROW_STYLE) {
                            td
                                colspan=(table.columns.len().max(1))
                                class={(TABLE_CELL_STYLE) " text-center"}
                            {
                                (empty_message)
                            }
                        }
                    }

                    @for row in &table.rows {
                        tr class=(TABLE_ROW_STYLE) {
                            @for value in row {
                                (cell_view(value))
                            }
                        }
                    }
                }
            }
        }
    }
}

fn cell_view(value: &Value) -> Markup {
    match value {
        Value::Null => html! {
            td class={(TABLE_CELL_STYLE) " " (NULL_CELL_STYLE)} { (value) }
        },
        Value::Integer(_) | Value::Real(_) => html! {
            td class={(TABLE_CELL_STYLE) " " (NUMBER_CELL_STYLE)} { (value) }
        },
        Value::Text(text) => html! {
            td class={(TABLE_CELL_STYLE) " whitespace-nowrap"} { (text) }
        },
    }
}

#[cfg(test)]
mod result_table_view_tests {
    use scraper::{Html, Selector};

    use crate::table::{Table, Value};

    use super::result_table_view;

    fn render(table: &Table) -> Html {
        Html::parse_fragment(&result_table_view(table, "No problems found.").into_string())
    }

    #[test]
    fn renders_header_and_rows() {
        let table = Table {
            columns: vec!["id".to_owned(), "count".to_owned()],
            rows: vec![
                vec![Value::Integer(7), Value::Integer(2)],
                vec![Value::Null, Value::Integer(3)],
            ],
        };

        let html = render(&table);

        let headers: Vec<String> = html
            .select(&Selector::parse("thead th").unwrap())
            .map(|th| th.text().collect())
            .collect();
        assert_eq!(headers, vec!["id", "count"]);

        let cells: Vec<Vec<String>> = html
            .select(&Selector::parse("tbody tr").unwrap())
            .map(|tr| {
                tr.select(&Selector::parse("td").unwrap())
                    .map(|td| td.text().collect())
                    .collect()
            })
            .collect();
        assert_eq!(cells, vec![vec!["7", "2"], vec!["None", "3"]]);
    }

    #[test]
    fn empty_table_shows_message() {
        let table = Table {
            columns: vec!["id".to_owned(), "count".to_owned()],
            rows: vec![],
        };

        let html = render(&table);

        let cell = html
            .select(&Selector::parse("tbody td").unwrap())
            .next()
            .expect("No message cell");
        assert_eq!(cell.text().collect::<String>(), "No problems found.");
        assert_eq!(cell.value().attr("colspan"), Some("2"));
    }
}
