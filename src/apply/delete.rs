use super::Reconciler;
use crate::{
    client::is_not_found,
    wait::{PollError, WaitBackoff},
    Error, Resource, Result,
};

/// How [`crate::List::delete`] treats removal
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeleteOptions {
    /// Wait until the objects are gone, not only until deletion is accepted
    pub wait: bool,
    pub backoff: WaitBackoff,
}

impl DeleteOptions {
    pub fn wait_for_delete() -> Self {
        Self {
            wait: true,
            ..Default::default()
        }
    }

    pub fn with_backoff(mut self, backoff: WaitBackoff) -> Self {
        self.backoff = backoff;
        self
    }
}

impl Reconciler {
    /// Delete a single resource, an object which is already absent is not an error
    pub(crate) async fn delete(&self, resource: &Resource, options: &DeleteOptions) -> Result<()> {
        let kind = resource.group_version_kind().kind_name();
        let name = resource.name();
        let address = self.address(resource, &kind).await?;

        match self.client.delete(&address).await {
            Ok(()) => {}
            Err(e) if is_not_found(&e) => return Ok(()),
            Err(source) => {
                return Err(Error::Delete {
                    kind,
                    name: name.to_owned(),
                    source,
                })
            }
        }
        log::info!("{} {:?} deleted", kind, name);

        if !options.wait {
            return Ok(());
        }

        let client = &self.client;
        let address = &address;
        let waited = options
            .backoff
            .poll(move || async move {
                match client.get(address).await {
                    Ok(_) => Ok(false),
                    Err(e) if is_not_found(&e) => Ok(true),
                    Err(e) => Err(e),
                }
            })
            .await;
        match waited {
            Ok(()) => Ok(()),
            Err(PollError::Timeout) => Err(Error::Timeout {
                kind,
                name: name.to_owned(),
            }),
            Err(PollError::Condition(source)) => Err(Error::WaitForDelete {
                kind,
                name: name.to_owned(),
                source,
            }),
        }
    }
}
