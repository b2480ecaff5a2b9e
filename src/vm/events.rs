/*
 * Copyright 2018 Intel Corporation
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 * -----------------------------------------------------------------------------
 */

//! Maps the EVM's LOG instructions onto validator events.

use crate::handler::{ContextError, TransactionContext};
use crate::vm::{EventSink, LogEvent};

pub const SETH_LOG_EVENT: &str = "seth_log_event";

pub struct SawtoothEventSink<'a> {
    context: &'a dyn TransactionContext,
}

impl<'a> SawtoothEventSink<'a> {
    pub fn new(context: &'a dyn TransactionContext) -> Self {
        SawtoothEventSink { context }
    }
}

impl<'a> EventSink for SawtoothEventSink<'a> {
    fn log(&mut self, log: LogEvent) -> Result<(), ContextError> {
        let mut attributes = vec![
            ("address".to_string(), hex::encode(log.address().as_bytes())),
            ("eventID".to_string(), log.address().to_string()),
        ];
        for (i, topic) in log.topics().iter().enumerate() {
            attributes.push((format!("topic{}", i + 1), hex::encode(topic.as_bytes())));
        }

        self.context
            .add_event(SETH_LOG_EVENT.to_string(), attributes, log.data().to_vec())
    }
}
