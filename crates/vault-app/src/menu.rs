//! Interactive numbered menu over a `RecordService`.
//!
//! Generic over its input and output so tests can drive it with in-memory
//! buffers. Each operation is a sequence of blocking line reads; end of
//! input at any prompt ends the session.

use std::io::{self, BufRead, Write};

use vault_core::error::VaultError;
use vault_core::report::{render_line, render_list, render_statistics, NO_RECORDS_MESSAGE};
use vault_core::types::{parse_date, NewRecord, RecordId, RecordUpdate};
use vault_storage::RecordService;

pub const FAREWELL: &str = "Thank you for using Secure Data Vault!";

const MENU: &str = "\
=== Secure Data Vault ===
1. View Records
2. Add Record
3. Update Record
4. Delete Record
5. Search Records
6. Sort Records
7. Export Data
8. View Vault Statistics
9. Exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    View,
    Add,
    Update,
    Delete,
    Search,
    Sort,
    Export,
    Statistics,
    Exit,
}

impl Choice {
    fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Choice::View),
            "2" => Some(Choice::Add),
            "3" => Some(Choice::Update),
            "4" => Some(Choice::Delete),
            "5" => Some(Choice::Search),
            "6" => Some(Choice::Sort),
            "7" => Some(Choice::Export),
            "8" => Some(Choice::Statistics),
            "9" => Some(Choice::Exit),
            _ => None,
        }
    }
}

/// Whether the session continues after an operation.
enum Flow {
    Continue,
    Exit,
    EndOfInput,
}

pub struct Menu<'a, R, W> {
    service: &'a RecordService,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    pub fn new(service: &'a RecordService, input: R, output: W) -> Self {
        Self {
            service,
            input,
            output,
        }
    }

    /// Run until the user exits or input ends, then print the farewell.
    ///
    /// Only I/O failures on the terminal itself are returned; operation
    /// errors are printed and the loop continues.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            writeln!(self.output, "\n{}", MENU)?;
            let Some(line) = self.prompt("\nChoose an option (1-9): ")? else {
                break;
            };

            let flow = match Choice::parse(&line) {
                Some(choice) => self.dispatch(choice)?,
                None => {
                    writeln!(self.output, "Invalid option. Please choose 1-9.")?;
                    Flow::Continue
                }
            };
            match flow {
                Flow::Continue => {}
                Flow::Exit | Flow::EndOfInput => break,
            }
        }

        writeln!(self.output, "\n{}", FAREWELL)?;
        self.output.flush()
    }

    fn dispatch(&mut self, choice: Choice) -> io::Result<Flow> {
        match choice {
            Choice::View => self.view(),
            Choice::Add => self.add(),
            Choice::Update => self.update(),
            Choice::Delete => self.delete(),
            Choice::Search => self.search(),
            Choice::Sort => self.sort(),
            Choice::Export => self.export(),
            Choice::Statistics => self.statistics(),
            Choice::Exit => Ok(Flow::Exit),
        }
    }

    /// Print `text` and read one line. `None` at end of input.
    fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn report_error(&mut self, action: &str, err: &VaultError) -> io::Result<Flow> {
        writeln!(self.output, "Error {}: {}", action, err)?;
        Ok(Flow::Continue)
    }

    fn report_backup(&mut self, backup: Option<&std::path::Path>) -> io::Result<()> {
        match backup {
            Some(path) => writeln!(self.output, "Backup created: {}", path.display()),
            None => writeln!(self.output, "Warning: backup creation failed"),
        }
    }

    fn view(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\n=== View Records ===")?;
        match self.service.list() {
            Ok(records) if records.is_empty() => writeln!(self.output, "{}", NO_RECORDS_MESSAGE)?,
            Ok(records) => write!(self.output, "{}", render_list(&records))?,
            Err(e) => return self.report_error("loading records", &e),
        }
        Ok(Flow::Continue)
    }

    fn add(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\n=== Add New Record ===")?;
        let Some(raw_id) = self.prompt("Enter ID (blank for auto): ")? else {
            return Ok(Flow::EndOfInput);
        };
        let Some(name) = self.prompt("Enter Name: ")? else {
            return Ok(Flow::EndOfInput);
        };

        let input = NewRecord {
            // Non-numeric input is treated as blank.
            id: raw_id.trim().parse::<RecordId>().ok(),
            name,
            created: None,
        };
        match self.service.add(&input) {
            Ok(committed) => {
                writeln!(
                    self.output,
                    "Record added successfully! (ID: {})",
                    committed.value.id
                )?;
                self.report_backup(committed.backup.as_deref())?;
            }
            Err(e) => return self.report_error("adding record", &e),
        }
        Ok(Flow::Continue)
    }

    fn update(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\n=== Update Record ===")?;
        let Some(token) = self.prompt("Enter ID or name of record to update: ")? else {
            return Ok(Flow::EndOfInput);
        };
        let record = match self.service.resolve(&token) {
            Ok(record) => record,
            Err(e) => return self.report_error("updating record", &e),
        };
        writeln!(self.output, "Current: {}", render_line(0, &record))?;

        let Some(name) = self.prompt("Enter new name: ")? else {
            return Ok(Flow::EndOfInput);
        };
        let Some(raw_date) = self.prompt("Enter new created date (YYYY-MM-DD, blank to keep): ")?
        else {
            return Ok(Flow::EndOfInput);
        };

        let created = if raw_date.trim().is_empty() {
            None
        } else {
            match parse_date(&raw_date) {
                Ok(date) => Some(date),
                Err(e) => return self.report_error("updating record", &e),
            }
        };

        match self
            .service
            .update(record.id, &RecordUpdate { name, created })
        {
            Ok(committed) => {
                writeln!(self.output, "Record updated successfully!")?;
                self.report_backup(committed.backup.as_deref())?;
            }
            Err(e) => return self.report_error("updating record", &e),
        }
        Ok(Flow::Continue)
    }

    fn delete(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\n=== Delete Record ===")?;
        let Some(token) = self.prompt("Enter ID or name of record to delete: ")? else {
            return Ok(Flow::EndOfInput);
        };
        let record = match self.service.resolve(&token) {
            Ok(record) => record,
            Err(e) => return self.report_error("deleting record", &e),
        };
        writeln!(self.output, "Found: {}", render_line(0, &record))?;

        let Some(answer) = self.prompt("Are you sure? (yes/no): ")? else {
            return Ok(Flow::EndOfInput);
        };
        if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            writeln!(self.output, "Deletion cancelled.")?;
            return Ok(Flow::Continue);
        }

        match self.service.delete(record.id) {
            Ok(committed) => {
                writeln!(self.output, "Record deleted successfully!")?;
                self.report_backup(committed.backup.as_deref())?;
            }
            Err(e) => return self.report_error("deleting record", &e),
        }
        Ok(Flow::Continue)
    }

    fn search(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\n=== Search Records ===")?;
        let Some(keyword) = self.prompt("Enter search keyword: ")? else {
            return Ok(Flow::EndOfInput);
        };
        match self.service.search(&keyword) {
            Ok(matches) if matches.is_empty() => writeln!(self.output, "{}", NO_RECORDS_MESSAGE)?,
            Ok(matches) => {
                writeln!(self.output, "Found {} matching records:", matches.len())?;
                write!(self.output, "{}", render_list(&matches))?;
            }
            Err(e) => return self.report_error("searching records", &e),
        }
        Ok(Flow::Continue)
    }

    fn sort(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\n=== Sort Records ===")?;
        let Some(field) = self.prompt("Sort by (name/date): ")? else {
            return Ok(Flow::EndOfInput);
        };
        let Some(order) = self.prompt("Order (asc/desc): ")? else {
            return Ok(Flow::EndOfInput);
        };

        match self.service.sorted(&field, &order) {
            Ok(sorted) => {
                if let Some(warning) = sorted.warning {
                    writeln!(self.output, "Warning: {}", warning)?;
                }
                if sorted.records.is_empty() {
                    writeln!(self.output, "{}", NO_RECORDS_MESSAGE)?;
                } else {
                    writeln!(self.output, "Sorted Records:")?;
                    write!(self.output, "{}", render_list(&sorted.records))?;
                }
            }
            Err(e) => return self.report_error("sorting records", &e),
        }
        Ok(Flow::Continue)
    }

    fn export(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\n=== Export Data ===")?;
        match self.service.export() {
            Ok(path) => writeln!(
                self.output,
                "Data exported successfully to {}",
                path.display()
            )?,
            Err(e) => return self.report_error("exporting data", &e),
        }
        Ok(Flow::Continue)
    }

    fn statistics(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\n=== Vault Statistics ===")?;
        match self.service.statistics() {
            Ok(stats) => write!(self.output, "{}", render_statistics(&stats))?,
            Err(e) => return self.report_error("loading statistics", &e),
        }
        Ok(Flow::Continue)
    }
}
