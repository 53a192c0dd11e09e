use super::TableStore;
use crate::error::StoreResult;
use crate::storage::record::ServicePropertiesRecord;

impl TableStore {
    pub fn get_service_properties(
        &self,
        account: &str,
    ) -> StoreResult<Option<ServicePropertiesRecord>> {
        self.ensure_open()?;
        self.services_collection()?.get(account)
    }

    /// Upsert by account name. On an existing record each payload field is
    /// replaced only when the incoming value is set.
    pub fn set_service_properties(
        &self,
        props: ServicePropertiesRecord,
    ) -> StoreResult<ServicePropertiesRecord> {
        self.ensure_open()?;
        let services = self.services_collection()?;

        let updated = match services.get::<ServicePropertiesRecord>(&props.account_name)? {
            Some(mut existing) => {
                if props.cors.is_some() {
                    existing.cors = props.cors;
                }
                if props.hour_metrics.is_some() {
                    existing.hour_metrics = props.hour_metrics;
                }
                if props.minute_metrics.is_some() {
                    existing.minute_metrics = props.minute_metrics;
                }
                if props.logging.is_some() {
                    existing.logging = props.logging;
                }
                existing
            }
            None => props,
        };

        let key = updated.account_name.clone();
        services.put(&key, &updated)?;
        Ok(updated)
    }
}
