use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::info;
use parquet::arrow::ArrowWriter;

use super::model::{FlightDataset, ELAPSED_COLUMN, TIMESTAMP_COLUMN};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Delimited export
// ---------------------------------------------------------------------------

/// Write the processed dataset as a delimited table.
///
/// Header is the canonical column order; missing values become empty fields.
pub fn write_delimited<W: Write>(dataset: &FlightDataset, writer: W, delimiter: u8) -> Result<()> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    out.write_record(dataset.column_names())?;

    let mut row: Vec<String> = Vec::with_capacity(dataset.channels.len() + 2);
    for i in 0..dataset.len() {
        row.clear();
        row.push(dataset.time_tokens[i].clone());
        row.extend(
            dataset
                .channels
                .iter()
                .map(|c| c.values[i].map(|v| v.to_string()).unwrap_or_default()),
        );
        row.push(dataset.elapsed[i].to_string());
        out.write_record(&row)?;
    }
    out.flush()?;
    Ok(())
}

pub fn export_csv(dataset: &FlightDataset, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_delimited(dataset, file, b',')?;
    info!("Wrote {} rows to {}", dataset.len(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet export
// ---------------------------------------------------------------------------

/// Arrow batch with a Utf8 timestamp column, one nullable Float64 column per
/// channel and the elapsed-time column.
pub fn to_record_batch(dataset: &FlightDataset) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(dataset.channels.len() + 2);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(dataset.channels.len() + 2);

    fields.push(Field::new(TIMESTAMP_COLUMN, DataType::Utf8, false));
    columns.push(Arc::new(StringArray::from(
        dataset.time_tokens.iter().map(String::as_str).collect::<Vec<_>>(),
    )));

    for channel in &dataset.channels {
        fields.push(Field::new(&channel.name, DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from(channel.values.clone())));
    }

    fields.push(Field::new(ELAPSED_COLUMN, DataType::Float64, false));
    columns.push(Arc::new(Float64Array::from(dataset.elapsed.clone())));

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
    Ok(batch)
}

pub fn export_parquet(dataset: &FlightDataset, path: &Path) -> Result<()> {
    let batch = to_record_batch(dataset)?;
    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    info!("Wrote {} rows to {}", dataset.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use crate::data::loader::{load_str, LoadOptions};

    #[test]
    fn test_delimited_export_keeps_missing_as_empty() {
        let input = "Time,ALT,CAS\n0:00:00:00.000,100,n/a\n0:00:00:00.500,100.5,80\n";
        let (ds, _) = load_str(input, &LoadOptions::single_header()).unwrap();

        let mut buf = Vec::new();
        write_delimited(&ds, &mut buf, b',').unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(
            text,
            "Timestamp,ALT,CAS,Elapsed Time (s)\n\
             0:00:00:00.000,100,,0\n\
             0:00:00:00.500,100.5,80,0.5\n"
        );
    }

    #[test]
    fn test_record_batch_shape() {
        let input = "Time,ALT\n0:00:00:00.000,1\n0:00:00:01.000,x\n";
        let (ds, _) = load_str(input, &LoadOptions::single_header()).unwrap();
        let batch = to_record_batch(&ds).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 3);
        assert_eq!(batch.column(1).null_count(), 1);
        assert_eq!(batch.schema().field(2).name(), ELAPSED_COLUMN);
    }
}
