//! EC2-family checks: instances, volumes, Elastic IPs and NAT gateways

use async_trait::async_trait;
use serde::Deserialize;

use super::Check;
use crate::error::GatewayError;
use crate::finding::Finding;
use crate::gateway::{args, decode, ProviderGateway};

// ============================================================
// Response Types
// ============================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstances {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    #[serde(default)]
    instances: Vec<Instance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Instance {
    instance_id: String,
    state: InstanceState,
    #[serde(default)]
    instance_type: String,
    #[serde(default)]
    placement: Placement,
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceState {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Placement {
    #[serde(default)]
    availability_zone: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Tag {
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeVolumes {
    #[serde(default)]
    volumes: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Volume {
    volume_id: String,
    state: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    volume_type: String,
    #[serde(default)]
    availability_zone: String,
    #[serde(default)]
    attachments: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeAddresses {
    #[serde(default)]
    addresses: Vec<Address>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Address {
    public_ip: Option<String>,
    // Wavelength addresses carry a carrier IP instead of a public IP
    carrier_ip: Option<String>,
    allocation_id: Option<String>,
    association_id: Option<String>,
    instance_id: Option<String>,
    network_interface_id: Option<String>,
}

impl Address {
    /// Public IP, else carrier IP, else allocation id
    fn display_id(&self) -> &str {
        [&self.public_ip, &self.carrier_ip, &self.allocation_id]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .find(|v| !v.is_empty())
            .unwrap_or(NO_ADDRESSES)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeNatGateways {
    #[serde(default)]
    nat_gateways: Vec<NatGateway>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NatGateway {
    nat_gateway_id: String,
    state: String,
    #[serde(default)]
    vpc_id: String,
    #[serde(default)]
    subnet_id: String,
    #[serde(default)]
    nat_gateway_addresses: Vec<NatGatewayAddress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NatGatewayAddress {
    public_ip: Option<String>,
}

/// NAT gateway states that still bill; `deleted` gateways linger in listings
const BILLABLE_NAT_STATES: [&str; 3] = ["available", "pending", "deleting"];

const NO_ADDRESSES: &str = "-";

// ============================================================
// Checks
// ============================================================

/// EC2 instances in any non-terminated state
pub struct Instances;

#[async_trait]
impl Check for Instances {
    fn id(&self) -> &'static str {
        "ec2"
    }

    fn name(&self) -> &'static str {
        "EC2 Instances"
    }

    async fn run(&self, gateway: &dyn ProviderGateway) -> Result<Vec<String>, GatewayError> {
        let response = gateway
            .call(
                "ec2",
                "describe-instances",
                &args([
                    "--filters",
                    "Name=instance-state-name,Values=pending,running,stopping,stopped",
                ]),
            )
            .await?;
        let response: DescribeInstances = decode(response, "EC2")?;

        Ok(response
            .reservations
            .iter()
            .flat_map(|r| &r.instances)
            .map(|inst| {
                Finding::new(&inst.instance_id)
                    .state(&inst.state.name)
                    .field(&inst.instance_type)
                    .field(&inst.placement.availability_zone)
                    .tag("Name", find_tag(&inst.tags, "Name"))
                    .into()
            })
            .collect())
    }
}

/// First tag whose key matches exactly
fn find_tag<'a>(tags: &'a [Tag], key: &str) -> Option<&'a str> {
    tags.iter()
        .find(|t| t.key == key)
        .map(|t| t.value.as_str())
}

/// EBS volumes that exist, attached or not
pub struct Volumes;

#[async_trait]
impl Check for Volumes {
    fn id(&self) -> &'static str {
        "ebs"
    }

    fn name(&self) -> &'static str {
        "EBS Volumes"
    }

    async fn run(&self, gateway: &dyn ProviderGateway) -> Result<Vec<String>, GatewayError> {
        let response = gateway
            .call(
                "ec2",
                "describe-volumes",
                &args(["--filters", "Name=status,Values=in-use,available"]),
            )
            .await?;
        let response: DescribeVolumes = decode(response, "EBS")?;

        Ok(response
            .volumes
            .iter()
            .map(|vol| {
                let attached = if vol.attachments.is_empty() {
                    "unattached"
                } else {
                    "attached"
                };

                Finding::new(&vol.volume_id)
                    .state(format!("{}/{}", vol.state, attached))
                    .field(format!("{}GiB", vol.size))
                    .field(&vol.volume_type)
                    .field(&vol.availability_zone)
                    .into()
            })
            .collect())
    }
}

/// Elastic IPs; unassociated addresses bill while idle
pub struct ElasticIps;

#[async_trait]
impl Check for ElasticIps {
    fn id(&self) -> &'static str {
        "eip"
    }

    fn name(&self) -> &'static str {
        "Elastic IPs"
    }

    async fn run(&self, gateway: &dyn ProviderGateway) -> Result<Vec<String>, GatewayError> {
        let response = gateway.call("ec2", "describe-addresses", &[]).await?;
        let response: DescribeAddresses = decode(response, "EIP")?;

        Ok(response
            .addresses
            .iter()
            .map(|addr| {
                let associated = addr
                    .association_id
                    .as_deref()
                    .is_some_and(|id| !id.is_empty());
                let status = if associated {
                    "associated"
                } else {
                    "UNASSOCIATED (billable)"
                };

                Finding::new(addr.display_id())
                    .state(status)
                    .attr_opt("instance", addr.instance_id.as_deref())
                    .attr_opt("eni", addr.network_interface_id.as_deref())
                    .into()
            })
            .collect())
    }
}

/// NAT gateways that are up, coming up, or still tearing down
pub struct NatGateways;

#[async_trait]
impl Check for NatGateways {
    fn id(&self) -> &'static str {
        "nat"
    }

    fn name(&self) -> &'static str {
        "NAT Gateways"
    }

    async fn run(&self, gateway: &dyn ProviderGateway) -> Result<Vec<String>, GatewayError> {
        let response = gateway.call("ec2", "describe-nat-gateways", &[]).await?;
        let response: DescribeNatGateways = decode(response, "NAT Gateway")?;

        Ok(response
            .nat_gateways
            .iter()
            .filter(|ngw| BILLABLE_NAT_STATES.contains(&ngw.state.as_str()))
            .map(|ngw| {
                let eips: Vec<&str> = ngw
                    .nat_gateway_addresses
                    .iter()
                    .filter_map(|a| a.public_ip.as_deref())
                    .filter(|ip| !ip.is_empty())
                    .collect();
                let eips = if eips.is_empty() {
                    NO_ADDRESSES.to_string()
                } else {
                    eips.join(",")
                };

                Finding::new(&ngw.nat_gateway_id)
                    .state(&ngw.state)
                    .attr("vpc", &ngw.vpc_id)
                    .attr("subnet", &ngw.subnet_id)
                    .attr("eips", eips)
                    .into()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::ScriptedGateway;
    use serde_json::json;

    const INSTANCES_KEY: &str = "ec2 describe-instances --filters Name=instance-state-name,Values=pending,running,stopping,stopped";
    const VOLUMES_KEY: &str = "ec2 describe-volumes --filters Name=status,Values=in-use,available";

    #[tokio::test]
    async fn test_instances_with_and_without_name_tag() {
        let gateway = ScriptedGateway::new().respond(
            INSTANCES_KEY,
            json!({
                "Reservations": [
                    {"Instances": [{
                        "InstanceId": "i-0aaa",
                        "State": {"Code": 16, "Name": "running"},
                        "InstanceType": "t3.micro",
                        "Placement": {"AvailabilityZone": "us-east-2a"},
                        "Tags": [
                            {"Key": "env", "Value": "dev"},
                            {"Key": "Name", "Value": "web"},
                            {"Key": "Name", "Value": "shadowed"}
                        ]
                    }]},
                    {"Instances": [{
                        "InstanceId": "i-0bbb",
                        "State": {"Code": 80, "Name": "stopped"},
                        "InstanceType": "m5.large",
                        "Placement": {"AvailabilityZone": "us-east-2b"}
                    }]}
                ]
            }),
        );

        let items = Instances.run(&gateway).await.unwrap();
        assert_eq!(
            items,
            vec![
                "i-0aaa [running] t3.micro us-east-2a Name=web",
                "i-0bbb [stopped] m5.large us-east-2b",
            ]
        );
    }

    #[tokio::test]
    async fn test_instances_empty_account() {
        let gateway = ScriptedGateway::new().respond(INSTANCES_KEY, json!({"Reservations": []}));
        assert!(Instances.run(&gateway).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_instances_list_failure_is_error() {
        let gateway = ScriptedGateway::new().fail(INSTANCES_KEY, "UnauthorizedOperation");
        let err = Instances.run(&gateway).await.unwrap_err();
        assert!(err.to_string().contains("UnauthorizedOperation"));
    }

    #[tokio::test]
    async fn test_volumes_attachment_classification() {
        let gateway = ScriptedGateway::new().respond(
            VOLUMES_KEY,
            json!({
                "Volumes": [
                    {
                        "VolumeId": "vol-1",
                        "State": "in-use",
                        "Size": 8,
                        "VolumeType": "gp3",
                        "AvailabilityZone": "us-east-2a",
                        "Attachments": [{"InstanceId": "i-0aaa", "State": "attached"}]
                    },
                    {
                        "VolumeId": "vol-2",
                        "State": "available",
                        "Size": 100,
                        "VolumeType": "st1",
                        "AvailabilityZone": "us-east-2c",
                        "Attachments": []
                    }
                ]
            }),
        );

        let items = Volumes.run(&gateway).await.unwrap();
        assert_eq!(
            items,
            vec![
                "vol-1 [in-use/attached] 8GiB gp3 us-east-2a",
                "vol-2 [available/unattached] 100GiB st1 us-east-2c",
            ]
        );
    }

    #[tokio::test]
    async fn test_volumes_decode_failure() {
        let gateway =
            ScriptedGateway::new().respond(VOLUMES_KEY, json!({"Volumes": [{"VolumeId": 3}]}));
        let err = Volumes.run(&gateway).await.unwrap_err();
        assert!(err.to_string().starts_with("failed to parse EBS response"));
    }

    #[tokio::test]
    async fn test_eip_association_labels() {
        let gateway = ScriptedGateway::new().respond(
            "ec2 describe-addresses",
            json!({
                "Addresses": [
                    {
                        "PublicIp": "198.51.100.7",
                        "AllocationId": "eipalloc-1",
                        "AssociationId": "eipassoc-1",
                        "InstanceId": "i-0aaa",
                        "NetworkInterfaceId": "eni-1"
                    },
                    {
                        "PublicIp": "198.51.100.8",
                        "AllocationId": "eipalloc-2"
                    }
                ]
            }),
        );

        let items = ElasticIps.run(&gateway).await.unwrap();
        assert_eq!(
            items,
            vec![
                "198.51.100.7 [associated] instance=i-0aaa eni=eni-1",
                "198.51.100.8 [UNASSOCIATED (billable)]",
            ]
        );
    }

    #[tokio::test]
    async fn test_eip_without_public_ip() {
        let gateway = ScriptedGateway::new().respond(
            "ec2 describe-addresses",
            json!({
                "Addresses": [
                    {"PublicIp": "198.51.100.9", "AllocationId": "eipalloc-1"},
                    {
                        "CarrierIp": "155.146.10.1",
                        "AllocationId": "eipalloc-2",
                        "NetworkBorderGroup": "us-east-1-wl1-bos-wlz-1"
                    },
                    {"AllocationId": "eipalloc-3"}
                ]
            }),
        );

        let items = ElasticIps.run(&gateway).await.unwrap();
        assert_eq!(
            items,
            vec![
                "198.51.100.9 [UNASSOCIATED (billable)]",
                "155.146.10.1 [UNASSOCIATED (billable)]",
                "eipalloc-3 [UNASSOCIATED (billable)]",
            ]
        );
    }

    #[tokio::test]
    async fn test_nat_state_filter_and_placeholder() {
        let gateway = ScriptedGateway::new().respond(
            "ec2 describe-nat-gateways",
            json!({
                "NatGateways": [
                    {
                        "NatGatewayId": "nat-live",
                        "State": "available",
                        "VpcId": "vpc-1",
                        "SubnetId": "subnet-1",
                        "NatGatewayAddresses": [
                            {"PublicIp": "203.0.113.1"},
                            {"PublicIp": "203.0.113.2"}
                        ]
                    },
                    {
                        "NatGatewayId": "nat-gone",
                        "State": "deleted",
                        "VpcId": "vpc-1",
                        "SubnetId": "subnet-2",
                        "NatGatewayAddresses": [{"PublicIp": "203.0.113.3"}]
                    },
                    {
                        "NatGatewayId": "nat-new",
                        "State": "pending",
                        "VpcId": "vpc-2",
                        "SubnetId": "subnet-3",
                        "NatGatewayAddresses": []
                    }
                ]
            }),
        );

        let items = NatGateways.run(&gateway).await.unwrap();
        assert_eq!(
            items,
            vec![
                "nat-live [available] vpc=vpc-1 subnet=subnet-1 eips=203.0.113.1,203.0.113.2",
                "nat-new [pending] vpc=vpc-2 subnet=subnet-3 eips=-",
            ]
        );
    }

    #[test]
    fn test_find_tag_first_match_wins() {
        let tags = vec![
            Tag {
                key: "Name".into(),
                value: "first".into(),
            },
            Tag {
                key: "Name".into(),
                value: "second".into(),
            },
        ];
        assert_eq!(find_tag(&tags, "Name"), Some("first"));
        assert_eq!(find_tag(&tags, "name"), None);
    }
}
