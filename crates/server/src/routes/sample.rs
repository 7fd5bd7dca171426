use axum::Json;
use once_cell::sync::Lazy;
use serde::Serialize;
use tabular::{CellValue, Row};

/// A built-in dataset for populating the charting UI.
#[derive(Debug, Clone, Serialize)]
pub struct SampleDataset {
    pub name: &'static str,
    pub filename: &'static str,
    pub data: Vec<Row>,
    pub columns: Vec<&'static str>,
}

static SAMPLE_DATASETS: Lazy<Vec<SampleDataset>> = Lazy::new(|| {
    vec![
        sample(
            "Sales Data",
            "sales_sample.csv",
            ["Month", "Sales", "Profit", "Expenses"],
            &[
                ("Jan", [4000, 2400, 1600]),
                ("Feb", [3000, 1398, 1602]),
                ("Mar", [2000, 9800, 2000]),
                ("Apr", [2780, 3908, 1800]),
                ("May", [1890, 4800, 1500]),
                ("Jun", [2390, 3800, 1700]),
            ],
        ),
        sample(
            "Temperature Data",
            "temperature_sample.csv",
            ["City", "Jan", "Feb", "Mar", "Apr", "May"],
            &[
                ("New York", [32, 35, 45, 55, 65]),
                ("Los Angeles", [60, 62, 65, 68, 72]),
                ("Chicago", [25, 28, 38, 50, 62]),
                ("Miami", [70, 72, 75, 78, 82]),
            ],
        ),
        sample(
            "Website Analytics",
            "analytics_sample.csv",
            ["Page", "Views", "Bounce Rate", "Time on Page"],
            &[
                ("Home", [15000, 35, 120]),
                ("About", [8500, 42, 90]),
                ("Products", [12000, 28, 180]),
                ("Contact", [3500, 55, 60]),
                ("Blog", [6200, 38, 210]),
            ],
        ),
    ]
});

/// A dataset whose first column is a text label and the rest are integers.
/// `C` is the column count, `V` the number of value columns.
fn sample<const C: usize, const V: usize>(
    name: &'static str,
    filename: &'static str,
    columns: [&'static str; C],
    rows: &[(&str, [i64; V])],
) -> SampleDataset {
    let data = rows
        .iter()
        .map(|(label, values)| {
            let labels = columns.iter().take(1).map(|c| (*c, CellValue::text(*label)));
            let numbers = columns
                .iter()
                .skip(1)
                .zip(values)
                .map(|(c, v)| (*c, CellValue::Integer(*v)));
            labels.chain(numbers).collect::<Row>()
        })
        .collect();

    SampleDataset {
        name,
        filename,
        data,
        columns: columns.to_vec(),
    }
}

/// The fixed sample datasets. Nothing is read from the store.
pub async fn get_sample_data() -> Json<&'static [SampleDataset]> {
    Json(SAMPLE_DATASETS.as_slice())
}
