//! Containment chain: the ordered list of contexts a lookup searches.

use std::collections::HashSet;

use log::{debug, warn};

use crate::domain::ContextRef;
use crate::error::Result;
use crate::store::ToolStore;

/// Build the search chain for `context`, nearest first.
///
/// - course: `[course, root_account]`
/// - account: `[account, parent, grandparent, ..., root]`
///
/// A context missing from the store gives an empty chain. A missing parent or
/// root account, or an account seen twice, ends the chain where it is.
pub fn context_chain<S: ToolStore>(store: &S, context: ContextRef) -> Result<Vec<ContextRef>> {
    match context {
        ContextRef::Course(id) => {
            let Some(course) = store.course(id)? else {
                debug!("Course {} not found, empty chain", id);
                return Ok(Vec::new());
            };

            let mut chain = vec![context];
            match store.account(course.root_account_id)? {
                Some(root) => chain.push(root.context()),
                None => warn!(
                    "Course {} references missing root account {}",
                    course.id, course.root_account_id
                ),
            }
            Ok(chain)
        }
        ContextRef::Account(id) => {
            let Some(mut account) = store.account(id)? else {
                debug!("Account {} not found, empty chain", id);
                return Ok(Vec::new());
            };

            let mut chain = Vec::new();
            let mut seen = HashSet::new();
            loop {
                seen.insert(account.id);
                chain.push(account.context());

                let Some(parent_id) = account.parent_account_id else {
                    break;
                };
                if seen.contains(&parent_id) {
                    warn!("Account {} repeats in the chain above account {}, stopping", parent_id, id);
                    break;
                }
                match store.account(parent_id)? {
                    Some(parent) => account = parent,
                    None => {
                        warn!("Account {} references missing parent account {}", account.id, parent_id);
                        break;
                    }
                }
            }
            Ok(chain)
        }
    }
}
