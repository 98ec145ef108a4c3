//! Meter polling loop

use crate::config::ClientConfig;
use crate::parameters::CumulativeParameters;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use wisun_core::WisunResult;
use wisun_echonet::{
    epc, interpret, EchonetObject, FlowDirection, Frame, MeasurementDateTime, Property,
    PropertyValue, ServiceCode,
};
use wisun_session::{AdapterSession, SessionConfig, SessionSignal};
use wisun_transport::TransportLayer;

/// How long one poll waits for adapter output before the loop gets a chance
/// to run its timers.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A converted reading published by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum MeterReading {
    /// Instantaneous power in watts.
    InstantaneousPower(i32),
    /// Cumulative energy in kilowatt hours at a meter-recorded time.
    CumulativeEnergy {
        recorded_at: MeasurementDateTime,
        kilowatt_hours: f64,
        direction: FlowDirection,
    },
    /// Cumulative energy total in kilowatt hours, forward direction.
    CumulativeEnergyTotal { kilowatt_hours: f64 },
    /// Object instances discovered on the node.
    Instances(Vec<EchonetObject>),
}

/// Drives one adapter session and reads the meter on configured intervals.
pub struct MeterReader<T: TransportLayer> {
    session: AdapterSession<T>,
    parameters: CumulativeParameters,
    power_interval: Duration,
    energy_interval: Duration,
    readings: Option<mpsc::UnboundedSender<MeterReading>>,
}

impl<T: TransportLayer> MeterReader<T> {
    pub fn new(transport: T, config: &ClientConfig) -> Self {
        let mut session_config =
            SessionConfig::new(config.route_b_id.clone(), config.route_b_password.clone());
        session_config.scan_duration = config.scan_duration;
        Self {
            session: AdapterSession::new(transport, session_config),
            parameters: CumulativeParameters::new(),
            power_interval: config.power_interval,
            energy_interval: config.energy_interval,
            readings: None,
        }
    }

    /// Deliver converted readings over a channel in addition to logging
    /// them.
    pub fn with_reading_channel(mut self, sender: mpsc::UnboundedSender<MeterReading>) -> Self {
        self.readings = Some(sender);
        self
    }

    pub fn session(&self) -> &AdapterSession<T> {
        &self.session
    }

    /// Cached cumulative-energy scaling parameters.
    pub fn parameters(&self) -> &CumulativeParameters {
        &self.parameters
    }

    /// Run the join handshake and the polling loop.
    ///
    /// Returns only on a transport error; the caller decides whether to
    /// reopen the transport and start over.
    pub async fn run(&mut self) -> WisunResult<()> {
        self.session.set_poll_interval(POLL_INTERVAL).await?;
        self.session.start().await?;

        let mut next_power = Instant::now();
        let mut next_energy = Instant::now();
        loop {
            if let Some(line) = self.session.poll_line().await? {
                let dispatch = self.session.dispatch(&line).await?;
                if let Some(signal) = dispatch.signal {
                    self.handle_signal(signal).await?;
                }
            }

            if !self.session.is_joined() {
                continue;
            }
            let now = Instant::now();
            if now >= next_power {
                next_power = now + self.power_interval;
                self.session
                    .send_frame(&Frame::instantaneous_power_request())
                    .await?;
            }
            if now >= next_energy {
                next_energy = now + self.energy_interval;
                if self.parameters.is_complete() {
                    self.session
                        .send_frame(&Frame::cumulative_energy_request(FlowDirection::Forward))
                        .await?;
                }
            }
        }
    }

    async fn handle_signal(&mut self, signal: SessionSignal) -> WisunResult<()> {
        match signal {
            SessionSignal::Joined => {
                log::info!("link established, requesting cumulative energy parameters");
                self.session
                    .send_frame(&Frame::cumulative_parameters_request())
                    .await
            }
            SessionSignal::FrameReceived(frame) => {
                self.process_frame(&frame);
                Ok(())
            }
        }
    }

    /// React to one decoded application frame.
    pub fn process_frame(&mut self, frame: &Frame) {
        let source = frame.seoj();
        if source == EchonetObject::NODE_PROFILE
            && frame.service_code() == Some(ServiceCode::Notify)
        {
            for property in frame.properties() {
                if property.epc() == epc::INSTANCE_LIST {
                    self.process_instance_list(&source, property);
                }
            }
        } else if source == EchonetObject::SMART_METER {
            for property in frame.properties() {
                self.process_meter_property(&source, property);
            }
        } else {
            log::warn!("frame from unexpected object [{}] ignored", source);
        }
    }

    fn process_instance_list(&mut self, source: &EchonetObject, property: &Property) {
        let instances = match interpret(source, property) {
            Ok(PropertyValue::InstanceList(instances)) => instances,
            Ok(other) => {
                log::warn!("unexpected instance list value: {:?}", other);
                return;
            }
            Err(error) => {
                log::warn!("{}", error);
                return;
            }
        };

        for instance in &instances {
            log::info!("node instance [{}]", instance);
        }
        if !instances.contains(&EchonetObject::SMART_METER) {
            log::error!("no smart electric energy meter on this PAN");
        }
        self.publish(MeterReading::Instances(instances));
    }

    /// Interpret one meter property. An unknown property is logged and
    /// skipped; its siblings in the same frame are still processed.
    fn process_meter_property(&mut self, source: &EchonetObject, property: &Property) {
        let value = match interpret(source, property) {
            Ok(value) => value,
            Err(error) => {
                log::warn!("{}", error);
                return;
            }
        };

        match value {
            PropertyValue::Coefficient(coefficient) => {
                log::debug!("cumulative energy coefficient {}", coefficient);
                self.parameters.set_coefficient(coefficient);
            }
            PropertyValue::EffectiveDigits(digits) => {
                log::debug!("cumulative counter has {} effective digits", digits);
                self.parameters.set_effective_digits(digits);
            }
            PropertyValue::UnitMultiplier(multiplier) => {
                log::debug!("cumulative energy unit multiplier {}", multiplier);
                self.parameters.set_unit_multiplier(multiplier);
            }
            PropertyValue::InstantaneousPower(watts) => {
                log::info!("instantaneous power {} W", watts);
                self.publish(MeterReading::InstantaneousPower(watts));
            }
            PropertyValue::CumulativeEnergyAtTime {
                recorded_at,
                raw,
                direction,
            } => match self.parameters.convert(raw) {
                Some(kilowatt_hours) => {
                    log::info!(
                        "cumulative energy ({:?}) {} kWh at {}",
                        direction,
                        kilowatt_hours,
                        recorded_at
                    );
                    self.publish(MeterReading::CumulativeEnergy {
                        recorded_at,
                        kilowatt_hours,
                        direction,
                    });
                }
                None => log::warn!("cumulative energy reading before parameters are known"),
            },
            PropertyValue::CumulativeEnergy(raw) => match self.parameters.convert(raw) {
                Some(kilowatt_hours) => {
                    log::info!("cumulative energy total {} kWh", kilowatt_hours);
                    self.publish(MeterReading::CumulativeEnergyTotal { kilowatt_hours });
                }
                None => log::warn!("cumulative energy reading before parameters are known"),
            },
            PropertyValue::InstanceList(_) => {
                log::debug!("instance list from the meter object ignored");
            }
        }
    }

    fn publish(&mut self, reading: MeterReading) {
        if let Some(sender) = &self.readings {
            if sender.send(reading).is_err() {
                log::debug!("reading receiver dropped");
                self.readings = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use wisun_core::{WisunError, WisunResult};
    use wisun_transport::StreamAccessor;

    struct IdleTransport;

    #[async_trait]
    impl StreamAccessor for IdleTransport {
        async fn set_timeout(&mut self, _timeout: Option<Duration>) -> WisunResult<()> {
            Ok(())
        }
        async fn read(&mut self, _buf: &mut [u8]) -> WisunResult<usize> {
            Err(WisunError::Timeout)
        }
        async fn write(&mut self, buf: &[u8]) -> WisunResult<usize> {
            Ok(buf.len())
        }
        async fn flush(&mut self) -> WisunResult<()> {
            Ok(())
        }
        fn is_closed(&self) -> bool {
            false
        }
        async fn close(&mut self) -> WisunResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl TransportLayer for IdleTransport {
        async fn open(&mut self) -> WisunResult<()> {
            Ok(())
        }
    }

    fn new_reader() -> (
        MeterReader<IdleTransport>,
        mpsc::UnboundedReceiver<MeterReading>,
    ) {
        let config = ClientConfig {
            serial_port: "/dev/ttyUSB0".to_string(),
            route_b_id: "00112233445566778899AABBCCDDEEFF".to_string(),
            route_b_password: "0123456789AB".to_string(),
            scan_duration: 6,
            power_interval: Duration::from_secs(10),
            energy_interval: Duration::from_secs(60),
        };
        let (sender, receiver) = mpsc::unbounded_channel();
        let reader = MeterReader::new(IdleTransport, &config).with_reading_channel(sender);
        (reader, receiver)
    }

    fn meter_response(properties: Vec<Property>) -> Frame {
        Frame::new(
            EchonetObject::SMART_METER,
            EchonetObject::CONTROLLER,
            ServiceCode::ReadResponse.to_u8(),
            properties,
        )
    }

    #[test]
    fn test_parameters_cached_from_response() {
        let (mut reader, _receiver) = new_reader();
        reader.process_frame(&meter_response(vec![
            Property::new(epc::COEFFICIENT, vec![0x00, 0x00, 0x00, 0x01]),
            Property::new(epc::EFFECTIVE_DIGITS, vec![0x06]),
            Property::new(epc::ENERGY_UNIT, vec![0x01]),
        ]));
        assert!(reader.parameters().is_complete());
        assert_eq!(reader.parameters().effective_digits(), Some(6));
    }

    #[test]
    fn test_power_reading_published() {
        let (mut reader, mut receiver) = new_reader();
        reader.process_frame(&meter_response(vec![Property::new(
            epc::INSTANTANEOUS_POWER,
            vec![0x00, 0x00, 0x01, 0xF4],
        )]));
        assert_eq!(
            receiver.try_recv().unwrap(),
            MeterReading::InstantaneousPower(500)
        );
    }

    #[test]
    fn test_cumulative_reading_needs_parameters() {
        let (mut reader, mut receiver) = new_reader();
        let measurement = Property::new(
            epc::CUMULATIVE_FORWARD_AT_TIME,
            vec![
                0x07, 0xE9, 0x08, 0x06, 0x0C, 0x00, 0x00, // timestamp
                0x00, 0x00, 0x30, 0x39, // raw counter 12345
            ],
        );

        // Before the parameters are cached the reading is dropped.
        reader.process_frame(&meter_response(vec![measurement.clone()]));
        assert!(receiver.try_recv().is_err());

        reader.process_frame(&meter_response(vec![
            Property::new(epc::COEFFICIENT, vec![0x00, 0x00, 0x00, 0x01]),
            Property::new(epc::EFFECTIVE_DIGITS, vec![0x06]),
            Property::new(epc::ENERGY_UNIT, vec![0x01]),
        ]));
        reader.process_frame(&meter_response(vec![measurement]));

        match receiver.try_recv().unwrap() {
            MeterReading::CumulativeEnergy {
                kilowatt_hours,
                direction,
                recorded_at,
            } => {
                assert_eq!(kilowatt_hours, 1234.5);
                assert_eq!(direction, FlowDirection::Forward);
                assert_eq!(recorded_at.year, 2025);
            }
            other => panic!("unexpected reading: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_property_does_not_stop_siblings() {
        let (mut reader, mut receiver) = new_reader();
        reader.process_frame(&meter_response(vec![
            Property::new(0x42, vec![0x00]),
            Property::new(epc::INSTANTANEOUS_POWER, vec![0x00, 0x00, 0x00, 0x64]),
        ]));
        assert_eq!(
            receiver.try_recv().unwrap(),
            MeterReading::InstantaneousPower(100)
        );
    }

    #[test]
    fn test_instance_list_notification() {
        let (mut reader, mut receiver) = new_reader();
        let frame = Frame::new(
            EchonetObject::NODE_PROFILE,
            EchonetObject::CONTROLLER,
            ServiceCode::Notify.to_u8(),
            vec![Property::new(
                epc::INSTANCE_LIST,
                vec![0x01, 0x02, 0x88, 0x01],
            )],
        );
        reader.process_frame(&frame);
        assert_eq!(
            receiver.try_recv().unwrap(),
            MeterReading::Instances(vec![EchonetObject::SMART_METER])
        );
    }
}
