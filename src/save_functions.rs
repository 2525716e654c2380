//! Run summary and matrix output

use std::io::Write;

use crate::driver::Alignment;
use crate::error::Result;
use crate::io_utils::set_ostream;
use crate::scoring::ScoringParams;

/// JSON object describing a finished alignment.
pub fn summary_json(aln: &Alignment, scoring: &ScoringParams) -> json::JsonValue {
    let mut results = json::JsonValue::new_object();

    results["rows"]           = (aln.matrix.num_rows() - 1).into();
    results["cols"]           = (aln.matrix.num_cols() - 1).into();
    results["padded_row_len"] = aln.padded_len.into();
    results["scan_rounds"]    = aln.rounds.into();
    results["best_score"]     = aln.best.score.into();
    results["best_row"]       = aln.best.row.into();
    results["best_col"]       = aln.best.col.into();
    results["elapsed_ms"]     = (aln.elapsed.as_secs_f64() * 1000.0).into();
    results["device"]         = aln.device.name.clone().into();
    results["backend"]        = aln.device.kind.to_string().into();

    let mut scores = json::JsonValue::new_object();
    scores["match"]      = scoring.match_score.into();
    scores["mismatch"]   = scoring.mismatch.into();
    scores["gap_open"]   = scoring.gap_open.into();
    scores["gap_extend"] = scoring.gap_extend.into();
    results["scoring"] = scores;

    results
}

/// Stores the run summary as pretty printed JSON
pub fn save_summary(aln: &Alignment, scoring: &ScoringParams, outfile: &str) -> Result<()> {
    log::info!("Writing summary to {}", outfile);
    let mut wbuf = set_ostream(&Some(outfile.to_owned()))?;
    writeln!(wbuf, "{}", summary_json(aln, scoring).pretty(2))?;
    wbuf.flush()?;
    Ok(())
}

/// Writes the score matrix to `outfile`, or stdout if `None`
pub fn save_matrix(aln: &Alignment, outfile: &Option<String>) -> Result<()> {
    let mut wbuf = set_ostream(outfile)?;
    aln.matrix.write_tsv(&mut wbuf)?;
    Ok(())
}
