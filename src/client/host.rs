//! Typed bindings for the control host's operations.
//!
//! Each method is a single call through [`Client`]; the host does the
//! work. Results are converted to Rust types and a result of the wrong
//! shape is reported as [`Error::Protocol`].
//!
//! Handles for tracks, plugins and parameters are opaque [`TargetRef`]s
//! handed out by the host and passed back verbatim.

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};
use crate::identifiers::TargetRef;
use crate::protocol::Value;
use crate::session::Observer;

use super::core::Client;

// ============================================================================
// TrackType
// ============================================================================

/// Kind of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackType {
    /// Audio track.
    Audio,
    /// MIDI track.
    Midi,
    /// Any other track (bus, folder, master, ...).
    Other,
}

impl TryFrom<i64> for TrackType {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Self::Audio),
            1 => Ok(Self::Midi),
            2 => Ok(Self::Other),
            other => Err(Error::protocol(format!("unknown track type {other}"))),
        }
    }
}

// ============================================================================
// Host
// ============================================================================

/// Named operations of a control host.
///
/// # Example
///
/// ```no_run
/// use hostlink::{Client, Host, Observer};
///
/// # async fn example() -> hostlink::Result<()> {
/// let client = Client::builder().build()?;
/// client.connect()?;
/// let host = Host::new(client);
///
/// let track = host.get_track_by_name("Vocals").await?;
/// host.set_track_volume(&track, -6.0).await?;
///
/// let observer = Observer::new(|value| println!("muted: {value}"));
/// host.add_track_mute_listener(&track, observer).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Host {
    client: Client,
}

impl Host {
    /// Wraps a client.
    #[inline]
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns the underlying client.
    #[inline]
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn call(&self, operation: &str, args: Vec<Value>) -> Result<Option<Value>> {
        self.client.invoke(operation, args).await
    }

    async fn call_on(&self, operation: &str, target: &TargetRef) -> Result<Option<Value>> {
        self.call(operation, vec![target.into()]).await
    }
}

// ============================================================================
// Host - General
// ============================================================================

impl Host {
    /// Returns the name of the DAW.
    pub async fn name(&self) -> Result<String> {
        string("name", self.call("name", Vec::new()).await?)
    }

    /// Returns the fader scale as `(position, gain_db)` pairs.
    ///
    /// Positions run from `0.0` to `1.0` and come back sorted; the bottom
    /// of the scale is usually `f64::NEG_INFINITY` dB.
    pub async fn get_fader_labels(&self) -> Result<Vec<(f64, f64)>> {
        fader_labels(self.call("get_fader_labels", Vec::new()).await?)
    }
}

// ============================================================================
// Host - Tracks
// ============================================================================

impl Host {
    /// Returns every track.
    pub async fn get_tracks(&self) -> Result<Vec<TargetRef>> {
        targets("get_tracks", self.call("get_tracks", Vec::new()).await?)
    }

    /// Returns the kind of a track.
    pub async fn get_track_type(&self, track: &TargetRef) -> Result<TrackType> {
        const OP: &str = "get_track_type";

        let value = required(OP, self.call_on(OP, track).await?)?;
        value
            .as_i64()
            .ok_or_else(|| unexpected(OP, "an integer", &value))
            .and_then(TrackType::try_from)
    }

    /// Returns the name of a track.
    pub async fn get_track_name(&self, track: &TargetRef) -> Result<String> {
        string("get_track_name", self.call_on("get_track_name", track).await?)
    }

    /// Returns `true` if a track is muted.
    pub async fn is_track_mute(&self, track: &TargetRef) -> Result<bool> {
        boolean("is_track_mute", self.call_on("is_track_mute", track).await?)
    }

    /// Mutes or unmutes a track.
    pub async fn set_track_mute(&self, track: &TargetRef, mute: bool) -> Result<()> {
        self.call("set_track_mute", vec![track.into(), mute.into()])
            .await
            .map(|_| ())
    }

    /// Observes a track's mute state.
    pub async fn add_track_mute_listener(&self, track: &TargetRef, observer: Observer) -> Result<()> {
        self.client.subscribe(track.clone(), "track_mute", observer).await
    }

    /// Stops observing a track's mute state.
    pub async fn remove_track_mute_listener(&self, track: &TargetRef, observer: &Observer) -> Result<()> {
        self.client.unsubscribe(track.clone(), "track_mute", observer).await
    }

    /// Returns a track's volume in dB.
    pub async fn get_track_volume(&self, track: &TargetRef) -> Result<f64> {
        float("get_track_volume", self.call_on("get_track_volume", track).await?)
    }

    /// Sets a track's volume in dB; `f64::NEG_INFINITY` is silence.
    pub async fn set_track_volume(&self, track: &TargetRef, volume_db: f64) -> Result<()> {
        self.call("set_track_volume", vec![track.into(), volume_db.into()])
            .await
            .map(|_| ())
    }

    /// Observes a track's volume.
    pub async fn add_track_volume_listener(&self, track: &TargetRef, observer: Observer) -> Result<()> {
        self.client.subscribe(track.clone(), "track_volume", observer).await
    }

    /// Stops observing a track's volume.
    pub async fn remove_track_volume_listener(
        &self,
        track: &TargetRef,
        observer: &Observer,
    ) -> Result<()> {
        self.client.unsubscribe(track.clone(), "track_volume", observer).await
    }

    /// Returns a track's pan position (-1.0 left to 1.0 right).
    pub async fn get_track_pan(&self, track: &TargetRef) -> Result<f64> {
        float("get_track_pan", self.call_on("get_track_pan", track).await?)
    }

    /// Sets a track's pan position.
    pub async fn set_track_pan(&self, track: &TargetRef, pan: f64) -> Result<()> {
        self.call("set_track_pan", vec![track.into(), pan.into()])
            .await
            .map(|_| ())
    }

    /// Observes a track's pan position.
    pub async fn add_track_pan_listener(&self, track: &TargetRef, observer: Observer) -> Result<()> {
        self.client.subscribe(track.clone(), "track_pan", observer).await
    }

    /// Stops observing a track's pan position.
    pub async fn remove_track_pan_listener(&self, track: &TargetRef, observer: &Observer) -> Result<()> {
        self.client.unsubscribe(track.clone(), "track_pan", observer).await
    }

    /// Returns the plugins on a track.
    pub async fn get_track_plugins(&self, track: &TargetRef) -> Result<Vec<TargetRef>> {
        targets("get_track_plugins", self.call_on("get_track_plugins", track).await?)
    }

    /// Returns the plugin named `name` on a track.
    pub async fn get_track_plugin(&self, track: &TargetRef, name: &str) -> Result<TargetRef> {
        const OP: &str = "get_track_plugin";
        target(OP, self.call(OP, vec![track.into(), name.into()]).await?)
    }

    /// Finds a track by name, ignoring case.
    pub async fn get_track_by_name(&self, name: &str) -> Result<TargetRef> {
        const OP: &str = "get_track_by_name";
        target(OP, self.call(OP, vec![name.into()]).await?)
    }

    /// Flips a track's mute state.
    pub async fn toggle_track_mute(&self, track: &TargetRef) -> Result<()> {
        self.call_on("toggle_track_mute", track).await.map(|_| ())
    }

    /// Flips the mute state of the track named `name`.
    pub async fn toggle_track_mute_by_name(&self, name: &str) -> Result<()> {
        self.call("toggle_track_mute_by_name", vec![name.into()])
            .await
            .map(|_| ())
    }

    /// Finds a plugin on a track by name, ignoring case.
    pub async fn get_track_plugin_by_name(&self, track: &TargetRef, name: &str) -> Result<TargetRef> {
        const OP: &str = "get_track_plugin_by_name";
        target(OP, self.call(OP, vec![track.into(), name.into()]).await?)
    }
}

// ============================================================================
// Host - Plugins
// ============================================================================

impl Host {
    /// Returns the name of a plugin.
    pub async fn get_plugin_name(&self, plugin: &TargetRef) -> Result<String> {
        string("get_plugin_name", self.call_on("get_plugin_name", plugin).await?)
    }

    /// Returns `true` if a plugin is enabled.
    pub async fn is_plugin_enabled(&self, plugin: &TargetRef) -> Result<bool> {
        boolean("is_plugin_enabled", self.call_on("is_plugin_enabled", plugin).await?)
    }

    /// Enables or bypasses a plugin.
    pub async fn set_plugin_enabled(&self, plugin: &TargetRef, enabled: bool) -> Result<()> {
        self.call("set_plugin_enabled", vec![plugin.into(), enabled.into()])
            .await
            .map(|_| ())
    }

    /// Observes a plugin's enabled state.
    pub async fn add_plugin_enabled_listener(&self, plugin: &TargetRef, observer: Observer) -> Result<()> {
        self.client.subscribe(plugin.clone(), "plugin_enabled", observer).await
    }

    /// Stops observing a plugin's enabled state.
    pub async fn remove_plugin_enabled_listener(
        &self,
        plugin: &TargetRef,
        observer: &Observer,
    ) -> Result<()> {
        self.client.unsubscribe(plugin.clone(), "plugin_enabled", observer).await
    }

    /// Flips a plugin's enabled state.
    pub async fn toggle_plugin_enabled(&self, plugin: &TargetRef) -> Result<()> {
        self.call_on("toggle_plugin_enabled", plugin).await.map(|_| ())
    }

    /// Returns the parameters of a plugin.
    pub async fn get_plugin_parameters(&self, plugin: &TargetRef) -> Result<Vec<TargetRef>> {
        targets("get_plugin_parameters", self.call_on("get_plugin_parameters", plugin).await?)
    }

    /// Returns the parameter named `name` of a plugin.
    pub async fn get_plugin_parameter(&self, plugin: &TargetRef, name: &str) -> Result<TargetRef> {
        const OP: &str = "get_plugin_parameter";
        target(OP, self.call(OP, vec![plugin.into(), name.into()]).await?)
    }

    /// Finds a plugin parameter by name, ignoring case.
    pub async fn get_plugin_parameter_by_name(&self, plugin: &TargetRef, name: &str) -> Result<TargetRef> {
        const OP: &str = "get_plugin_parameter_by_name";
        target(OP, self.call(OP, vec![plugin.into(), name.into()]).await?)
    }
}

// ============================================================================
// Host - Parameters
// ============================================================================

impl Host {
    /// Returns the name of a parameter.
    pub async fn get_parameter_name(&self, param: &TargetRef) -> Result<String> {
        string("get_parameter_name", self.call_on("get_parameter_name", param).await?)
    }

    /// Returns a parameter's `(min, max)` range.
    pub async fn get_parameter_range(&self, param: &TargetRef) -> Result<(f64, f64)> {
        const OP: &str = "get_parameter_range";

        let value = required(OP, self.call_on(OP, param).await?)?;
        match value.as_array() {
            Some([min, max]) => Ok((
                float(OP, Some(min.clone()))?,
                float(OP, Some(max.clone()))?,
            )),
            _ => Err(unexpected(OP, "a [min, max] pair", &value)),
        }
    }

    /// Returns a parameter's value.
    pub async fn get_parameter_value(&self, param: &TargetRef) -> Result<f64> {
        float("get_parameter_value", self.call_on("get_parameter_value", param).await?)
    }

    /// Sets a parameter's value.
    pub async fn set_parameter_value(&self, param: &TargetRef, value: f64) -> Result<()> {
        self.call("set_parameter_value", vec![param.into(), value.into()])
            .await
            .map(|_| ())
    }

    /// Observes a parameter's value.
    pub async fn add_parameter_value_listener(&self, param: &TargetRef, observer: Observer) -> Result<()> {
        self.client.subscribe(param.clone(), "parameter_value", observer).await
    }

    /// Stops observing a parameter's value.
    pub async fn remove_parameter_value_listener(
        &self,
        param: &TargetRef,
        observer: &Observer,
    ) -> Result<()> {
        self.client.unsubscribe(param.clone(), "parameter_value", observer).await
    }

    /// Returns a parameter's value as the host displays it (e.g. `"-6.0 dB"`).
    pub async fn get_parameter_display_value(&self, param: &TargetRef) -> Result<String> {
        const OP: &str = "get_parameter_display_value";
        string(OP, self.call_on(OP, param).await?)
    }

    /// Observes a parameter's display value.
    pub async fn add_parameter_display_value_listener(
        &self,
        param: &TargetRef,
        observer: Observer,
    ) -> Result<()> {
        self.client
            .subscribe(param.clone(), "parameter_display_value", observer)
            .await
    }

    /// Stops observing a parameter's display value.
    pub async fn remove_parameter_display_value_listener(
        &self,
        param: &TargetRef,
        observer: &Observer,
    ) -> Result<()> {
        self.client
            .unsubscribe(param.clone(), "parameter_display_value", observer)
            .await
    }
}

// ============================================================================
// Result Conversion
// ============================================================================

fn unexpected(operation: &str, expected: &str, got: &Value) -> Error {
    Error::protocol(format!("{operation}: expected {expected}, got {got}"))
}

fn required(operation: &str, result: Option<Value>) -> Result<Value> {
    result.ok_or_else(|| Error::protocol(format!("{operation}: missing result")))
}

fn string(operation: &str, result: Option<Value>) -> Result<String> {
    match required(operation, result)? {
        Value::String(s) => Ok(s),
        other => Err(unexpected(operation, "a string", &other)),
    }
}

fn boolean(operation: &str, result: Option<Value>) -> Result<bool> {
    let value = required(operation, result)?;
    value
        .as_bool()
        .ok_or_else(|| unexpected(operation, "a boolean", &value))
}

fn float(operation: &str, result: Option<Value>) -> Result<f64> {
    let value = required(operation, result)?;
    value
        .as_f64()
        .ok_or_else(|| unexpected(operation, "a number", &value))
}

fn fader_labels(result: Option<Value>) -> Result<Vec<(f64, f64)>> {
    const OP: &str = "get_fader_labels";

    let labels = match required(OP, result)? {
        Value::Object(labels) => labels,
        other => return Err(unexpected(OP, "an object", &other)),
    };

    // Keys are fader positions printed as JSON object keys, e.g. "0.058".
    let mut scale = labels
        .into_iter()
        .map(|(key, db)| {
            let position = key
                .parse::<f64>()
                .map_err(|_| Error::protocol(format!("{OP}: non-numeric key {key}")))?;
            Ok((position, float(OP, Some(db))?))
        })
        .collect::<Result<Vec<_>>>()?;

    scale.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(scale)
}

fn target(operation: &str, result: Option<Value>) -> Result<TargetRef> {
    let value = required(operation, result)?;
    TargetRef::from_value(&value).map_err(|_| unexpected(operation, "a handle", &value))
}

fn targets(operation: &str, result: Option<Value>) -> Result<Vec<TargetRef>> {
    match required(operation, result)? {
        Value::Array(items) => items
            .iter()
            .map(|item| TargetRef::from_value(item).map_err(|_| unexpected(operation, "a handle", item)))
            .collect(),
        other => Err(unexpected(operation, "an array of handles", &other)),
    }
}

// ============================================================================
// Tests
// ============================================================================
