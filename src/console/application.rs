use std::io;
use std::time::Duration;
use futures::StreamExt;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use indexmap::IndexSet;
use log::{error, info, warn};
use tokio::io::{stdin, AsyncBufReadExt, BufReader};

use crate::console::device_list::{format_device, DeviceList};
use crate::console::types::{parse_line, ConsoleCommand, Message, HELP};
use crate::device::constants::SCAN_PERMISSIONS;
use crate::device::enable::enable_adapter;
use crate::device::radio::{PermissionGate, RadioAdapter};
use crate::device::session::ScanSession;
use crate::device::types::{EnableOutcome, ScanEvent, StartOutcome};
use crate::error::ScanError;

pub struct ConsoleApplication<R: RadioAdapter, P: PermissionGate> {
    session: ScanSession<R, P>,
    scan_period: Duration,

    // devices seen since the last `clear`, across scans
    devices: DeviceList,

    // addresses reported by the current scan only
    scan_addresses: IndexSet<String>,

    // scan callbacks send here; the receiving end is returned from `new`
    event_sender: UnboundedSender<ScanEvent>,

    // lines to show the user, drained by `take_output`
    output: Vec<String>,
}

impl<R: RadioAdapter, P: PermissionGate> ConsoleApplication<R, P> {
    pub fn new(session: ScanSession<R, P>, scan_period: Duration) -> (Self, UnboundedReceiver<ScanEvent>) {
        let (event_sender, event_receiver) = unbounded();

        let app = ConsoleApplication {
            session,
            scan_period,
            devices: DeviceList::new(),
            scan_addresses: IndexSet::new(),
            event_sender,
            output: Vec::new(),
        };

        (app, event_receiver)
    }

    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    fn notice<S: Into<String>>(&mut self, message: S) {
        self.output.push(message.into());
    }

    fn print_output(&mut self) {
        for line in self.take_output() {
            println!("{}", line);
        }
    }

    fn show_devices(&mut self) {
        if self.devices.is_empty() {
            self.notice("No devices found");
            return;
        }

        let lines = self.devices.render();
        self.output.extend(lines);
    }

    async fn start_scan(&mut self, duration: Duration) -> Result<StartOutcome, ScanError> {
        let device_sender = self.event_sender.clone();
        let stopped_sender = self.event_sender.clone();

        let on_device = move |device| {
            if let Err(err) = device_sender.unbounded_send(ScanEvent::Device(device)) {
                warn!("Failed to deliver discovered device: {}", err);
            }
        };
        let on_stopped = move || {
            if let Err(err) = stopped_sender.unbounded_send(ScanEvent::Stopped) {
                warn!("Failed to deliver scan stop: {}", err);
            }
        };

        let result = self.session.start(duration, on_device, on_stopped).await;

        match &result {
            Ok(StartOutcome::Started) => {
                self.scan_addresses.clear();
                self.notice(format!("Scanning for {}...", humantime::format_duration(duration)));
            },
            Ok(StartOutcome::AlreadyScanning) => {
                self.notice("A scan is already running");
            },
            Err(err) => self.report_error(err).await,
        }

        result
    }

    async fn enable(&mut self) -> Result<EnableOutcome, ScanError> {
        let result = enable_adapter(self.session.radio().as_ref(), self.session.permissions().as_ref()).await;

        match &result {
            Ok(EnableOutcome::AlreadyEnabled) => self.notice("Bluetooth is already enabled"),
            Ok(EnableOutcome::PromptLaunched) => self.notice("Please turn bluetooth on in the settings that were opened"),
            Err(err) => self.report_error(err).await,
        }

        result
    }

    async fn report_error(&mut self, err: &ScanError) {
        match err {
            ScanError::PermissionDenied => {
                // the user retries once the permission has been granted
                self.session.permissions().request(&SCAN_PERMISSIONS).await;
                self.notice("Bluetooth permission is required, please try again");
            },
            err => {
                error!("{}", err);
                self.notice(format!("{}", err));
            },
        }
    }

    /// Handle one message; returns false once the application should exit.
    pub async fn update(&mut self, message: Message) -> bool {
        match message {
            Message::Command(command) => match command {
                ConsoleCommand::Enable => {
                    let _ = self.enable().await;
                },
                ConsoleCommand::Scan => {
                    let _ = self.start_scan(self.scan_period).await;
                },
                ConsoleCommand::Stop => {
                    if !self.session.stop().await {
                        self.notice("No scan is running");
                    }
                },
                ConsoleCommand::List => self.show_devices(),
                ConsoleCommand::Clear => {
                    self.devices.clear();
                    self.notice("Device list cleared");
                },
                ConsoleCommand::Help => self.notice(HELP),
                ConsoleCommand::Quit => {
                    self.session.stop().await;
                    return false;
                },
            },
            Message::UnknownInput(input) => {
                self.notice(format!("Unknown command \"{}\", type help for a list of commands", input));
            },
            Message::Scan(ScanEvent::Device(device)) => {
                let line = format_device(&device);
                self.scan_addresses.insert(device.address.clone());
                if self.devices.record(device) {
                    self.notice(format!("Found {}", line));
                }
            },
            Message::Scan(ScanEvent::Stopped) => {
                self.notice(format!("Scan stopped, {} device(s) found", self.scan_addresses.len()));
            },
        }

        true
    }

    /// Run a single scan of `duration` (or the configured period) and print what was found.
    pub async fn scan_once(&mut self, events: &mut UnboundedReceiver<ScanEvent>, duration: Option<Duration>) -> Result<(), ScanError> {
        let duration = duration.unwrap_or(self.scan_period);

        let result = self.start_scan(duration).await;
        self.print_output();
        result?;

        while let Some(event) = events.next().await {
            let stopped = event == ScanEvent::Stopped;
            self.update(Message::Scan(event)).await;

            if stopped {
                break;
            }
            self.print_output();
        }

        self.show_devices();
        self.print_output();
        Ok(())
    }

    pub async fn enable_once(&mut self) -> Result<(), ScanError> {
        let result = self.enable().await;
        self.print_output();
        result.map(|_| ())
    }

    /// Read commands from stdin until `quit` or end of input.
    pub async fn run_interactive(&mut self, events: &mut UnboundedReceiver<ScanEvent>) -> Result<(), io::Error> {
        let mut lines = BufReader::new(stdin()).lines();

        self.notice(HELP);
        self.print_output();

        'mainloop: loop {
            let message = tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) => match parse_line(&line) {
                        Some(message) => message,
                        None => continue 'mainloop,
                    },
                    None => {
                        info!("End of input");
                        Message::Command(ConsoleCommand::Quit)
                    },
                },
                Some(event) = events.next() => Message::Scan(event),
            };

            let keep_running = self.update(message).await;
            self.print_output();

            if !keep_running {
                break 'mainloop;
            }
        }

        Ok(())
    }
}
