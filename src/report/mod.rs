pub mod table;
pub mod json;

use crate::snapshot::Snapshot;

pub fn print(snapshots: &[Snapshot], json_output: bool) {
    if json_output {
        println!("{}", json::render(snapshots));
    } else {
        print!("{}", table::render(snapshots));
    }
}
