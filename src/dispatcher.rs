//! The southbound event loop: reacts to switch control-channel events,
//! driving the wire codec, delay calculus, state store, admission engine and
//! switch programmer together. See SPEC_FULL.md §4.6.

use crate::admission::{check_end_to_end_latency, try_admit, AdmissionError};
use crate::config::Config;
use crate::delay::ClassDelayMap;
use crate::error::ControllerError;
use crate::frame::{parse_reservation_frame, with_reservation_payload, RawFrame};
use crate::reservation::{Reservation, Status, StreamKey};
use crate::southbound::SwitchCommand;
use crate::store::{AdvertisementCheck, ReservationStore};
use crate::switch::{CliSession, CliTransport};
use crate::units::ceil_div_u64;

/// Owns every piece of mutable state the reference implementation keeps as
/// process-wide globals: the reservation store and the exclusive CLI
/// session handle (SPEC_FULL.md §9, "Global mutable state").
pub struct Controller<T: CliTransport> {
    store: ReservationStore,
    delta: ClassDelayMap,
    cli: CliSession<T>,
    config: Config,
}

impl<T: CliTransport> Controller<T> {
    pub fn new(config: Config, transport: T) -> Self {
        let cli = CliSession::new(
            transport,
            config.switch_username.clone(),
            config.qos_flow_list_name.clone(),
        );
        Controller {
            store: ReservationStore::new(),
            delta: ClassDelayMap::standard(),
            cli,
            config,
        }
    }

    /// Handles the switch's initial handshake: reset the flow table to only
    /// punt reservation frames, then bring up the CLI side-channel.
    pub fn on_switch_features(&mut self) -> Result<Vec<SwitchCommand>, ControllerError> {
        self.cli.connect()?;
        Ok(vec![SwitchCommand::PurgeFlowTable, SwitchCommand::InstallPuntRule])
    }

    /// Handles a frame punted to the controller on `in_port`, returning the
    /// southbound command (if any) that should be sent in response.
    pub fn on_packet_in(
        &mut self,
        in_port: u16,
        frame: RawFrame,
    ) -> Result<Option<SwitchCommand>, ControllerError> {
        let (status, reservation) = match parse_reservation_frame(&frame) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unparsable reservation frame");
                return Ok(None);
            }
        };

        match status {
            Status::Advertisement => Ok(self.handle_advertisement(in_port, &frame, reservation)),
            Status::Subscription => self.handle_subscription(in_port, &frame, reservation),
            Status::Acknowledgement => Ok(None),
        }
    }

    fn handle_advertisement(
        &mut self,
        in_port: u16,
        frame: &RawFrame,
        advertisement: Reservation,
    ) -> Option<SwitchCommand> {
        let key = StreamKey::from(&advertisement);

        let flood_copy = match self.store.check_advertisement(key, &advertisement) {
            AdvertisementCheck::Unchanged(flood_copy) => flood_copy,
            AdvertisementCheck::Stale => {
                if let Err(e) = check_end_to_end_latency(&advertisement, &self.delta) {
                    tracing::warn!(?key, error = %e, "advertisement violates its end-to-end latency bound");
                    return None;
                }

                let mut flood_copy = advertisement;
                flood_copy.acc_min_delay += ceil_div_u64(
                    advertisement.min_frame as u64 * 8,
                    self.config.link_speed_bps,
                ) as u32;
                flood_copy.acc_max_delay += self.delta.get(advertisement.priority).unwrap_or(0);

                self.store.store_advertisement(key, advertisement, flood_copy, in_port);
                tracing::info!(?key, port = in_port, "stored new advertisement");
                flood_copy
            }
        };

        match with_reservation_payload(frame, Status::Advertisement, &flood_copy) {
            Ok(flooded) => Some(SwitchCommand::Flood {
                frame: flooded,
                except_port: in_port,
            }),
            Err(e) => {
                tracing::warn!(?key, error = %e, "failed to rebuild advertisement frame for flooding");
                None
            }
        }
    }

    fn handle_subscription(
        &mut self,
        in_port: u16,
        frame: &RawFrame,
        subscription: Reservation,
    ) -> Result<Option<SwitchCommand>, ControllerError> {
        let key = StreamKey::from(&subscription);

        let Some(entry) = self.store.advertisement(&key).copied() else {
            tracing::warn!(?key, "subscription for an unknown stream; dropping");
            return Ok(None);
        };

        // The candidate carries the original (pre-hop) advertisement's
        // acc_min_delay/acc_max_delay, not the subscription PDU's own
        // already-advanced values, per the invariant documented on
        // `admission::try_admit`.
        let candidate = entry.original.with_dst_ip(subscription.dst_ip);
        let listener_ip = subscription.dst_ip;

        match try_admit(
            &mut self.store,
            &candidate,
            listener_ip,
            in_port,
            &self.delta,
            self.config.link_speed_bps,
        ) {
            Ok(wcd) => {
                self.cli.add_tsn_stream(&candidate)?;
                tracing::info!(?key, port = in_port, wcd, "admitted subscription");
                Ok(Some(SwitchCommand::Unicast {
                    frame: frame.clone(),
                    out_port: entry.ingress_port,
                }))
            }
            Err(e) => {
                self.log_admission_rejection(&key, &e);
                Ok(None)
            }
        }
    }

    fn log_admission_rejection(&self, key: &StreamKey, error: &AdmissionError) {
        tracing::warn!(?key, %error, "subscription rejected");
    }
}
