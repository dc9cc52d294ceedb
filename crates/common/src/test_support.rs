#[cfg(test)]
pub mod tests {
    use std::sync::{Arc, Mutex};

    use error_stack::Report;
    use url::Url;

    use crate::auction::environment::{BeaconSender, HostEnvironment, PageEnvironment, ScriptTag};
    use crate::error::AdapterError;
    use crate::integrations::sublime::telemetry::{AnalyticsBridge, TelemetryOptions};
    use crate::settings::Settings;

    pub fn crate_test_settings_str() -> String {
        r#"
            [adapter]
            protocol = "https"
            bid_host = "pbjs.sskzlabs.com"
            tag_host = "sac.ayads.co"
            default_currency = "EUR"
            prebid_version = "1.2.3"

            [telemetry]
            enabled = true
            host = "antenna.ayads.co"
            "#
        .to_string()
    }

    pub fn create_test_settings() -> Settings {
        let toml_str = crate_test_settings_str();
        Settings::from_toml(&toml_str).expect("Invalid config")
    }

    /// Records inserted scripts.
    #[derive(Default)]
    pub struct RecordingPage {
        scripts: Mutex<Vec<ScriptTag>>,
        fail: bool,
    }

    impl RecordingPage {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn scripts(&self) -> Vec<ScriptTag> {
            self.scripts.lock().unwrap().clone()
        }
    }

    impl PageEnvironment for RecordingPage {
        fn insert_script(&self, script: &ScriptTag) -> Result<(), Report<AdapterError>> {
            if self.fail {
                return Err(Report::new(AdapterError::Request {
                    message: "page refused script".to_string(),
                }));
            }
            self.scripts.lock().unwrap().push(script.clone());
            Ok(())
        }
    }

    /// Records beacon URLs.
    #[derive(Default)]
    pub struct RecordingBeacon {
        urls: Mutex<Vec<Url>>,
        fail: bool,
    }

    impl RecordingBeacon {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn urls(&self) -> Vec<Url> {
            self.urls.lock().unwrap().clone()
        }

        /// Event names (`e` parameter) of the recorded beacons, in order.
        pub fn events(&self) -> Vec<String> {
            self.urls()
                .iter()
                .filter_map(|url| {
                    url.query_pairs()
                        .find(|(key, _)| key == "e")
                        .map(|(_, value)| value.into_owned())
                })
                .collect()
        }

        /// `reqid` parameter of the first beacon carrying `event`.
        pub fn request_id_of(&self, event: &str) -> Option<String> {
            self.param_of(event, "reqid")
        }

        /// Query parameter `key` of the first pixel fired for `event`.
        pub fn param_of(&self, event: &str, key: &str) -> Option<String> {
            self.urls().iter().find_map(|url| {
                let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
                let matches = pairs.iter().any(|(k, value)| k == "e" && value == event);
                if !matches {
                    return None;
                }
                pairs
                    .into_iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, value)| value)
            })
        }
    }

    impl BeaconSender for RecordingBeacon {
        fn send_beacon(&self, url: &Url) -> Result<(), Report<AdapterError>> {
            if self.fail {
                return Err(Report::new(AdapterError::Telemetry {
                    message: "beacon refused".to_string(),
                }));
            }
            self.urls.lock().unwrap().push(url.clone());
            Ok(())
        }
    }

    /// Records analytics bridge calls as `(zone, event, request id)`.
    #[derive(Default)]
    pub struct RecordingBridge {
        events: Mutex<Vec<(String, String, Option<String>)>>,
    }

    impl RecordingBridge {
        pub fn events(&self) -> Vec<(String, String, Option<String>)> {
            self.events.lock().unwrap().clone()
        }
    }

    impl AnalyticsBridge for RecordingBridge {
        fn send_event(
            &self,
            zone_id: &str,
            event: &str,
            options: &TelemetryOptions,
        ) -> Result<(), Report<AdapterError>> {
            self.events.lock().unwrap().push((
                zone_id.to_string(),
                event.to_string(),
                options.request_id.clone(),
            ));
            Ok(())
        }
    }

    /// Host environment backed by recording doubles.
    pub fn recording_environment() -> (HostEnvironment, Arc<RecordingPage>, Arc<RecordingBeacon>) {
        let page = Arc::new(RecordingPage::default());
        let beacon = Arc::new(RecordingBeacon::default());
        let env = HostEnvironment::new(page.clone(), beacon.clone());
        (env, page, beacon)
    }
}
