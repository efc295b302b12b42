//! Serial port discovery and setup.

use console::{style, Term};
use dialoguer::{theme::ColorfulTheme, Select};
use log::{debug, info, warn};
use serialport::{available_ports, SerialPortType};

use crate::{transport::SerialLink, Error, Settings};

//==============================================================================
// Public Interface
//==============================================================================

/// Ask the user to pick one of the serial ports present on the system.
///
/// Returns `None` when there is no port to pick from or the user hits `Esc`.
pub fn select_port() -> Option<String> {
    let ports = enumerate_serial_ports();
    if ports.is_empty() {
        warn!("no serial port found, is the display connected?");
        return None;
    }

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "Select the port the display is connected to (`{}` to cancel):",
            style("Esc").cyan()
        ))
        .items(&ports)
        .default(0)
        .interact_on_opt(&Term::stderr());

    match selection {
        Ok(Some(index)) => ports[index].split(':').next().map(String::from),
        Ok(None) => {
            debug!("user did not select any port");
            None
        }
        Err(ref e) => {
            info!("error: {}", e);
            None
        }
    }
}

/// Open the port named in `settings`, retrying for a few seconds in case the
/// device is still being enumerated, and configure it.
pub fn open_and_setup_port(settings: &Settings) -> Result<SerialLink, Error> {
    use retry::{delay, retry_with_index};

    let path = match &settings.path {
        Some(path) => path.clone(),
        None => {
            return Err(serialport::Error::new(
                serialport::ErrorKind::InvalidInput,
                "no serial port given",
            )
            .into())
        }
    };

    let result = retry_with_index(delay::Fixed::from_millis(1000).take(4), |index| {
        debug!("Trying to open {} ({})", path, index);
        serialport::new(&path, settings.baud_rate)
            .data_bits(settings.data_bits)
            .stop_bits(settings.stop_bits)
            .parity(settings.parity)
            .flow_control(settings.flow_control)
            .open()
    });

    let mut port = match result {
        Ok(port) => port,
        Err(retry::Error::Operation {
            error,
            total_delay,
            tries,
        }) => {
            info!(
                "Failed to open the port after {:?} and {} tries: {}",
                total_delay, tries, error,
            );
            return Err(error.into());
        }
        Err(retry::Error::Internal(msg)) => {
            info!("Internal retry error while opening port: {}", msg);
            return Err(serialport::Error::new(serialport::ErrorKind::Unknown, msg).into());
        }
    };

    // Some platforms ignore the builder values, apply them again.
    port.set_baud_rate(settings.baud_rate)?;
    port.set_data_bits(settings.data_bits)?;
    port.set_stop_bits(settings.stop_bits)?;
    port.set_parity(settings.parity)?;
    port.set_flow_control(settings.flow_control)?;

    info!("Connected to {} at {} baud", path, settings.baud_rate);
    debug!("data_bits    : {:#?}", settings.data_bits);
    debug!("stop_bits    : {:#?}", settings.stop_bits);
    debug!("parity       : {:#?}", settings.parity);
    debug!("flow control : {:#?}", settings.flow_control);

    Ok(SerialLink::new(port, settings.baud_rate))
}

//==============================================================================
// Private stuff
//==============================================================================

/// Enumerates serial devices on the system, USB ones with their manufacturer
/// and product names.
fn enumerate_serial_ports() -> Vec<String> {
    match available_ports() {
        Ok(ports) => ports
            .into_iter()
            .map(|p| match p.port_type {
                SerialPortType::UsbPort(info) => format!(
                    "{}: ({} / {})",
                    p.port_name,
                    info.manufacturer.as_deref().unwrap_or(""),
                    info.product.as_deref().unwrap_or("")
                ),
                _ => p.port_name,
            })
            .collect(),
        Err(ref e) => {
            info!("error: {}", e);
            vec![]
        }
    }
}
