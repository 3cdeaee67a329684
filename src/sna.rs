//! The System Numerical Attribute service.
//!
//! Blocks parameterize themselves with expression strings; at execution time
//! each string is resolved against the model state to a textual value. A
//! string that matches no attribute token evaluates to itself, so plain
//! numbers and entity names pass through unchanged.

use rand::Rng;

use crate::error::Error;
use crate::{BlockId, Model, XactId};

fn fmt(value: f32) -> String {
    format!("{}", value)
}

impl Model {
    /// Resolves an attribute token to a textual value.
    ///
    /// Clock, termination-count, and random tokens need no transaction;
    /// transaction-scoped tokens (`A1`, `XN1`, `M1`, `PR`, `P$`, `MP$`) fail
    /// without one. Unrecognized tokens evaluate to themselves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TokenRequiresTransaction`] for a transaction-scoped
    /// token evaluated without a transaction, and [`Error::UnknownLabel`]
    /// for an entry-count token naming no block.
    pub fn evaluate(&mut self, token: &str, xact: Option<XactId>) -> Result<String, Error> {
        match token {
            "C1" => return Ok(fmt(self.relative_clock)),
            "AC1" => return Ok(fmt(self.absolute_clock)),
            "TG1" => return Ok(self.termination_count.to_string()),
            "RN" => {
                let draw: f32 = self.rng.gen::<f32>() * 999.0;
                return Ok(fmt(draw));
            }
            "A1" | "XN1" | "M1" | "PR" => {
                let xact = self.require_xact(token, xact)?;
                return Ok(match token {
                    "A1" => xact.assembly_set().to_string(),
                    "XN1" => xact.id().to_string(),
                    "M1" => fmt(self.absolute_clock - xact.mark_time()),
                    _ => xact.priority().to_string(),
                });
            }
            _ => {}
        }

        if let Some(label) = token.strip_prefix("N$") {
            let id = self
                .find_block(label)
                .ok_or_else(|| Error::UnknownLabel(label.to_string()))?;
            return Ok(self.block(id).entry_count.to_string());
        }
        if let Some(name) = token.strip_prefix("P$") {
            let xact = self.require_xact(token, xact)?;
            return Ok(fmt(xact.parameter(name).unwrap_or(0.0)));
        }
        if let Some(name) = token.strip_prefix("MP$") {
            let xact = self.require_xact(token, xact)?;
            return Ok(fmt(self.absolute_clock - xact.parameter(name).unwrap_or(0.0)));
        }
        if let Some(name) = token.strip_prefix("FC$") {
            return Ok(self
                .facilities
                .get(name)
                .map_or(0, crate::Facility::capture_count)
                .to_string());
        }
        if let Some(name) = token.strip_prefix("F$") {
            let available = self.facilities.get(name).map_or(true, crate::Facility::is_available);
            return Ok(String::from(if available { "1" } else { "0" }));
        }
        if let Some(value) = self.queue_attribute(token) {
            return Ok(value);
        }
        if let Some(value) = self.storage_attribute(token) {
            return Ok(value);
        }
        if let Some(name) = token.strip_prefix("X$") {
            return Ok(fmt(self.save_values.get(name).copied().unwrap_or(0.0)));
        }

        Ok(token.to_string())
    }

    fn queue_attribute(&self, token: &str) -> Option<String> {
        let queue = |name: &str| self.queues.get(name);
        if let Some(name) = token.strip_prefix("QA$") {
            return Some(fmt(
                queue(name).map_or(0.0, |q| q.average_content(self.relative_clock))
            ));
        }
        if let Some(name) = token.strip_prefix("QC$") {
            return Some(queue(name).map_or(0, crate::QueueStats::total_entries).to_string());
        }
        if let Some(name) = token.strip_prefix("QM$") {
            return Some(queue(name).map_or(0, crate::QueueStats::max_count).to_string());
        }
        if let Some(name) = token.strip_prefix("QT$") {
            return Some(fmt(queue(name).map_or(0.0, |q| q.average_wait(false))));
        }
        if let Some(name) = token.strip_prefix("QX$") {
            return Some(fmt(queue(name).map_or(0.0, |q| q.average_wait(true))));
        }
        if let Some(name) = token.strip_prefix("QZ$") {
            return Some(queue(name).map_or(0, crate::QueueStats::zero_entries).to_string());
        }
        if let Some(name) = token.strip_prefix("Q$") {
            return Some(queue(name).map_or(0, crate::QueueStats::current_count).to_string());
        }
        None
    }

    fn storage_attribute(&self, token: &str) -> Option<String> {
        let storage = |name: &str| self.storages.get(name);
        if let Some(name) = token.strip_prefix("SA$") {
            return Some(fmt(
                storage(name).map_or(0.0, |s| s.average_usage(self.relative_clock))
            ));
        }
        if let Some(name) = token.strip_prefix("SE$") {
            return Some(String::from(
                if storage(name).map_or(true, crate::Storage::is_empty) {
                    "1"
                } else {
                    "0"
                },
            ));
        }
        if let Some(name) = token.strip_prefix("SM$") {
            return Some(String::from(
                if storage(name).map_or(false, crate::Storage::is_full) {
                    "1"
                } else {
                    "0"
                },
            ));
        }
        if let Some(name) = token.strip_prefix("S$") {
            return Some(storage(name).map_or(0, crate::Storage::current_usage).to_string());
        }
        if let Some(name) = token.strip_prefix("R$") {
            return Some(
                storage(name)
                    .map_or(0, crate::Storage::available_capacity)
                    .to_string(),
            );
        }
        None
    }

    fn require_xact(&self, token: &str, xact: Option<XactId>) -> Result<&crate::Transaction, Error> {
        let id = xact.ok_or_else(|| Error::TokenRequiresTransaction(token.to_string()))?;
        Ok(self.xact(id))
    }

    /// Evaluates a numeric operand; the empty operand is `None`.
    pub(crate) fn eval_num_opt(
        &mut self,
        operand: &str,
        xact: Option<XactId>,
        block_id: BlockId,
        position: char,
    ) -> Result<Option<f32>, Error> {
        if operand.is_empty() {
            return Ok(None);
        }
        let value = self.evaluate(operand, xact)?;
        match value.trim().parse::<f32>() {
            Ok(number) => Ok(Some(number)),
            Err(_) => {
                let (block, process) = self.block_context(block_id);
                Err(Error::MalformedOperand {
                    block,
                    process,
                    operand: position,
                    value,
                })
            }
        }
    }

    /// Evaluates a non-negative count operand; the empty operand is `None`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub(crate) fn eval_count_opt(
        &mut self,
        operand: &str,
        xact: Option<XactId>,
        block_id: BlockId,
        position: char,
    ) -> Result<Option<u32>, Error> {
        let number = self.eval_num_opt(operand, xact, block_id, position)?;
        Ok(number.map(|number| if number <= 0.0 { 0 } else { number as u32 }))
    }
}

#[cfg(test)]
mod test {
    use crate::{BlockKind, Model, ProcessDef};

    fn model() -> Model {
        Model::builder()
            .termination_count(1)
            .seed(17)
            .storage("TANK", 3)
            .save_value("X1", 2.5)
            .process(
                ProcessDef::new("main")
                    .labeled_block("GEN", BlockKind::generate("10", "", "", "1", ""))
                    .block(BlockKind::terminate("")),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_literals_evaluate_to_themselves() {
        let mut model = model();
        assert_eq!(model.evaluate("42", None).unwrap(), "42");
        assert_eq!(model.evaluate("BARBER", None).unwrap(), "BARBER");
    }

    #[test]
    fn test_clock_and_counter_tokens() {
        let mut model = model();
        assert_eq!(model.evaluate("C1", None).unwrap(), "0");
        assert_eq!(model.evaluate("AC1", None).unwrap(), "0");
        assert_eq!(model.evaluate("TG1", None).unwrap(), "1");
    }

    #[test]
    fn test_transaction_tokens_require_a_transaction() {
        let mut model = model();
        assert!(model.evaluate("XN1", None).is_err());
        assert!(model.evaluate("PR", None).is_err());
        assert!(model.evaluate("P$wait", None).is_err());
    }

    #[test]
    fn test_entry_count_token() {
        let mut model = model();
        assert_eq!(model.evaluate("N$GEN", None).unwrap(), "0");
        assert!(model.evaluate("N$NOSUCH", None).is_err());
    }

    #[test]
    fn test_storage_tokens() {
        let mut model = model();
        assert_eq!(model.evaluate("R$TANK", None).unwrap(), "3");
        assert_eq!(model.evaluate("S$TANK", None).unwrap(), "0");
        assert_eq!(model.evaluate("SE$TANK", None).unwrap(), "1");
        assert_eq!(model.evaluate("SM$TANK", None).unwrap(), "0");
    }

    #[test]
    fn test_queue_tokens_default_to_zero() {
        let mut model = model();
        assert_eq!(model.evaluate("Q$LINE", None).unwrap(), "0");
        assert_eq!(model.evaluate("QM$LINE", None).unwrap(), "0");
        assert_eq!(model.evaluate("QT$LINE", None).unwrap(), "0");
    }

    #[test]
    fn test_save_value_token() {
        let mut model = model();
        assert_eq!(model.evaluate("X$X1", None).unwrap(), "2.5");
        assert_eq!(model.evaluate("X$MISSING", None).unwrap(), "0");
    }

    #[test]
    fn test_random_token_is_in_range() {
        let mut model = model();
        let value: f32 = model.evaluate("RN", None).unwrap().parse().unwrap();
        assert!((0.0..1000.0).contains(&value));
    }
}
