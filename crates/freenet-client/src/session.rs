use fcp_transport::FcpConnection;
use fcp_uri::PubSuffix;
use tokio::net::TcpStream;

use crate::error::Error;
use crate::node_info::NodeInfo;

/// A single FCP connection scoped to one operation.
///
/// Per spec, sessions are never shared between concurrent requests: each
/// raw operation opens its own and the connection is dropped (and with it,
/// closed) once the operation completes or errors out.
pub struct FcpSession {
    conn: FcpConnection<TcpStream>,
}

impl FcpSession {
    pub async fn connect(host: &str, port: u16) -> Result<Self, Error> {
        let conn = FcpConnection::connect((host, port))
            .await
            .map_err(|_| Error::Connect {
                host: host.to_string(),
                port,
            })?;
        Ok(FcpSession { conn })
    }

    pub fn conn_mut(&mut self) -> &mut FcpConnection<TcpStream> {
        &mut self.conn
    }

    /// Performs the `ClientHello`/`NodeHello` handshake and reports what the
    /// node told us about itself. The connection is closed afterwards — per
    /// spec, the handshake is its own short-lived session.
    pub async fn handshake(host: &str, port: u16) -> Result<NodeInfo, Error> {
        let mut session = Self::connect(host, port).await?;
        let conn = session.conn_mut();

        conn.send_line("ClientHello").await?;
        conn.send_line("EndMessage").await?;

        let line = conn.recv_line().await?;
        if line != "NodeHello" {
            return Err(Error::Protocol(format!(
                "expected NodeHello, got {line:?} ({host}:{port} may not be an FCP port)"
            )));
        }

        let mut max_file_size = 0u64;
        let mut node_type = String::new();
        let mut node_version = String::new();
        let mut protocol = String::new();

        loop {
            let line = conn.recv_line().await?;
            if line == "EndMessage" {
                break;
            }
            let (field, value) = line
                .split_once('=')
                .ok_or_else(|| Error::Protocol(format!("bad NodeHello field: {line:?}")))?;
            match field {
                "MaxFileSize" => {
                    max_file_size = u64::from_str_radix(value, 16).map_err(|_| {
                        Error::Protocol(format!("bad MaxFileSize field: {value:?}"))
                    })?;
                }
                "Node" => {
                    let (kind, version) = value.split_once(',').ok_or_else(|| {
                        Error::Protocol(format!("bad Node field: {value:?}"))
                    })?;
                    node_type = kind.to_string();
                    node_version = version.to_string();
                }
                "Protocol" => protocol = value.to_string(),
                _ => {
                    log::trace!("ignoring unrecognized NodeHello field {field}={value}");
                }
            }
        }

        let pub_suffix = PubSuffix::for_node_type(&node_type);
        log::debug!(
            "handshake with {host}:{port}: node={node_type},{node_version} protocol={protocol} suffix={pub_suffix:?}"
        );

        Ok(NodeInfo {
            max_file_size,
            node_type,
            node_version,
            protocol,
            pub_suffix,
        })
    }

    /// Queries the node's current `EstimatedLoad` via `ClientInfo`. Grounded
    /// on `freenet.py`'s `_fec_getNodeLoad`, which the FEC engine used to
    /// pick among several candidate nodes before handing off block I/O; a
    /// single-node client surfaces the number rather than acting on it.
    pub async fn estimated_load(host: &str, port: u16) -> Result<u32, Error> {
        let mut session = Self::connect(host, port).await?;
        let conn = session.conn_mut();

        conn.send_line("ClientInfo").await?;
        conn.send_line("EndMessage").await?;

        let mut load = None;
        loop {
            let line = conn.recv_line().await?;
            if line == "EndMessage" {
                break;
            }
            if let Some((field, value)) = line.split_once('=') {
                if field == "EstimatedLoad" {
                    load = Some(u32::from_str_radix(value, 16).map_err(|_| {
                        Error::Protocol(format!("bad EstimatedLoad field: {value:?}"))
                    })?);
                }
            }
        }

        load.ok_or_else(|| Error::Protocol("ClientInfo: node sent no EstimatedLoad".to_string()))
    }
}
